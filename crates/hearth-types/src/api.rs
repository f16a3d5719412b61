use serde::{Deserialize, Serialize};

use crate::models::{HouseId, User, UserId};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the activity WebSocket.
/// Carries identity only; the password never enters a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub house_ids: Vec<HouseId>,
}

// -- Actuators --

#[derive(Debug, Deserialize)]
pub struct LightLevelRequest {
    pub light_level: f64,
}

#[derive(Debug, Deserialize)]
pub struct FanSpeedRequest {
    pub fan_speed: f64,
}

// -- Device pushes --

#[derive(Debug, Deserialize)]
pub struct TemperatureReading {
    pub house_id: HouseId,
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub struct HumidityReading {
    pub house_id: HouseId,
    pub humid: f64,
}

#[derive(Debug, Deserialize)]
pub struct FanSpeedReading {
    pub house_id: HouseId,
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct DeviceUpdateRequest {
    pub house_id: HouseId,
    pub device_id: i64,
    pub device_type: String,
    pub data: f64,
    pub state: bool,
}

// -- Sets --

#[derive(Debug, Default, Deserialize)]
pub struct ApplySetsQuery {
    #[serde(default)]
    pub atomic: bool,
}

#[derive(Debug, Serialize)]
pub struct MemberFailureResponse {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ApplySetsResponse {
    pub applied: usize,
    pub failures: Vec<MemberFailureResponse>,
}

// -- Faces --

#[derive(Debug, Serialize)]
pub struct FaceVerifyResponse {
    pub is_match: bool,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
