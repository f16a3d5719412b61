use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type HouseId = i64;
pub type DeviceId = i64;

/// Fixed mask that replaces a password before a user leaves the server.
pub const PASSWORD_MASK: &str = "********";

/// A dashboard user as returned to clients. `password` is always the mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub password: String,
}

/// One member of a named setting ("scene"): the value and state a device
/// should be driven to when the setting is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetMember {
    pub house_id: HouseId,
    pub name: String,
    pub device_id: DeviceId,
    pub device_data: f64,
    pub device_state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseSetting {
    pub name: String,
    pub house_id: HouseId,
    pub selected: bool,
}

/// Append-only audit entry, written whenever device data or state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub activity_id: i64,
    pub house_id: HouseId,
    pub time: DateTime<Utc>,
    pub device: String,
    pub type_of_event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: i64,
    pub house_id: HouseId,
    pub title: String,
    pub description: String,
    pub time: DateTime<Utc>,
}

/// Merged view of the house's sensor and actuator feeds.
///
/// Numeric fields fall back to `0.0` when a feed value does not parse, and
/// boolean fields to `false`. Feeds that could not be read at all are named
/// in `degraded`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub light: bool,
    pub fan: bool,
    pub door: bool,
    pub light_level: f64,
    pub fan_speed: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}
