use serde::Serialize;
use tracing::info;

use crate::{FeedClient, FeedError};

pub const ALARM_ON: &str = "Alarm On";
pub const ALARM_OFF: &str = "Alarm Off";
pub const FAN_ON: &str = "Fan On";
pub const FAN_OFF: &str = "Fan Off";
pub const DOOR_OPEN: &str = "Open Door";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Alarm,
    LightLevel,
    Fan,
    FanSpeed,
}

impl Actuator {
    pub fn name(self) -> &'static str {
        match self {
            Actuator::Alarm => "alarm",
            Actuator::LightLevel => "light level",
            Actuator::Fan => "fan",
            Actuator::FanSpeed => "fan speed",
        }
    }
}

/// A validated actuator command. Levels and speeds are range-checked before
/// one of these is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    LightOn,
    LightOff,
    LightLevel(u8),
    FanOn,
    FanOff,
    FanSpeed(u8),
}

impl Command {
    pub fn actuator(self) -> Actuator {
        match self {
            Command::LightOn | Command::LightOff => Actuator::Alarm,
            Command::LightLevel(_) => Actuator::LightLevel,
            Command::FanOn | Command::FanOff => Actuator::Fan,
            Command::FanSpeed(_) => Actuator::FanSpeed,
        }
    }

    /// The string sent as `value` to the webhook.
    pub fn payload(self) -> String {
        match self {
            Command::LightOn => ALARM_ON.to_string(),
            Command::LightOff => ALARM_OFF.to_string(),
            Command::LightLevel(level) => level.to_string(),
            Command::FanOn => FAN_ON.to_string(),
            Command::FanOff => FAN_OFF.to_string(),
            Command::FanSpeed(speed) => speed.to_string(),
        }
    }

    /// Device name used in activity log entries.
    pub fn device(self) -> &'static str {
        match self {
            Command::LightOn | Command::LightOff | Command::LightLevel(_) => "Light",
            Command::FanOn | Command::FanOff | Command::FanSpeed(_) => "Fan",
        }
    }

    pub fn describe(self) -> String {
        match self {
            Command::LightLevel(level) => format!("Light level {}", level),
            Command::FanSpeed(speed) => format!("Fan speed {}", speed),
            other => other.payload(),
        }
    }
}

#[derive(Serialize)]
struct WebhookBody {
    value: String,
}

impl FeedClient {
    /// POST `{"value": ...}` to the actuator's webhook.
    pub async fn send_command(&self, command: Command) -> Result<(), FeedError> {
        let actuator = command.actuator();
        let url = self
            .config
            .webhooks
            .url(actuator)
            .ok_or(FeedError::NotConfigured(actuator.name()))?;

        let resp = self
            .http
            .post(url)
            .json(&WebhookBody {
                value: command.payload(),
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        info!("{} webhook <- {:?}", actuator.name(), command.payload());
        Ok(())
    }
}
