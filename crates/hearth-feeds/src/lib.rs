//! Outbound HTTP for the dashboard: feed reads, actuator webhooks and the
//! face-recognition service.
//!
//! One [`FeedClient`] is built at startup and cloned into every handler; the
//! underlying reqwest client pools connections and applies the configured
//! per-request timeout to every call.

pub mod actuators;
pub mod dashboard;
pub mod error;
pub mod face;
pub mod feeds;

use std::sync::Arc;
use std::time::Duration;

pub use actuators::{Actuator, Command};
pub use error::FeedError;
pub use feeds::Feed;

/// Default feed keys, in [`Feed::ALL`] order.
pub const DEFAULT_FEED_KEYS: [&str; 7] = [
    "iot-temperature",
    "iot-humidity",
    "iot-alarm",
    "iot-state",
    "iot-fan",
    "iot-fanspeed",
    "iot-door",
];

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL of the feed API. `{house_id}` is substituted per request.
    pub feed_base_url: String,
    /// Feed key per [`Feed`], indexed by [`Feed::index`].
    pub feed_keys: [String; 7],
    pub webhooks: Webhooks,
    pub face_service_url: String,
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_base_url: "https://io.adafruit.com/api/v2/hearth/feeds".into(),
            feed_keys: DEFAULT_FEED_KEYS.map(String::from),
            webhooks: Webhooks::default(),
            face_service_url: "https://face-reg-service-latest.onrender.com".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Webhook URL per actuator. A missing URL makes the command fail rather
/// than silently succeed.
#[derive(Debug, Clone, Default)]
pub struct Webhooks {
    pub alarm: Option<String>,
    pub light_level: Option<String>,
    pub fan: Option<String>,
    pub fan_speed: Option<String>,
}

impl Webhooks {
    pub fn url(&self, actuator: Actuator) -> Option<&str> {
        match actuator {
            Actuator::Alarm => self.alarm.as_deref(),
            Actuator::LightLevel => self.light_level.as_deref(),
            Actuator::Fan => self.fan.as_deref(),
            Actuator::FanSpeed => self.fan_speed.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    config: Arc<FeedConfig>,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: FeedConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }
}
