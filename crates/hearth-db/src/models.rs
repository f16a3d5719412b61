//! Database row types, mapped directly from SQLite rows.
//! Kept apart from hearth-types so the password hash never leaves this crate
//! by accident.

use chrono::{DateTime, Utc};

use hearth_types::models::{DeviceId, HouseId, PASSWORD_MASK, User, UserId};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: UserId,
    pub username: String,
    /// Argon2id PHC string.
    pub password: String,
}

impl UserRow {
    /// The outward-facing user, with the password replaced by the mask.
    pub fn redacted(&self) -> User {
        User {
            user_id: self.user_id,
            username: self.username.clone(),
            password: PASSWORD_MASK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub house_id: HouseId,
    pub device_id: DeviceId,
    pub device_type: String,
    pub current_data: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataRecordRow {
    pub record_id: i64,
    pub house_id: HouseId,
    pub device_id: DeviceId,
    pub time: DateTime<Utc>,
    pub value: f64,
    pub state: bool,
}
