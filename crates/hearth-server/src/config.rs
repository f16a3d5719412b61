use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use hearth_feeds::{DEFAULT_FEED_KEYS, FeedConfig, Webhooks};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

/// Feed key variables, in `Feed::ALL` order.
const FEED_KEY_VARS: [&str; 7] = [
    "HEARTH_FEED_TEMPERATURE",
    "HEARTH_FEED_HUMIDITY",
    "HEARTH_FEED_LIGHT",
    "HEARTH_FEED_LIGHT_LEVEL",
    "HEARTH_FEED_FAN",
    "HEARTH_FEED_FAN_SPEED",
    "HEARTH_FEED_DOOR",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub device_key: String,
    pub request_timeout: Duration,
    pub feeds: FeedConfig,
    pub seed_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("HEARTH_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HEARTH_JWT_SECRET is unset or still a placeholder");
        }

        let Some(device_key) = var("HEARTH_DEVICE_KEY") else {
            bail!("HEARTH_DEVICE_KEY is unset");
        };

        let port: u16 = var("HEARTH_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("HEARTH_PORT is not a port number")?;
        let http_timeout =
            secs(var("HEARTH_HTTP_TIMEOUT_SECS"), 10).context("HEARTH_HTTP_TIMEOUT_SECS")?;
        let request_timeout =
            secs(var("HEARTH_REQUEST_TIMEOUT_SECS"), 30).context("HEARTH_REQUEST_TIMEOUT_SECS")?;

        let defaults = FeedConfig::default();
        let mut feed_keys = DEFAULT_FEED_KEYS.map(String::from);
        for (slot, key) in feed_keys.iter_mut().zip(FEED_KEY_VARS) {
            if let Some(value) = var(key) {
                *slot = value;
            }
        }

        let feeds = FeedConfig {
            feed_base_url: var("HEARTH_FEED_BASE_URL").unwrap_or(defaults.feed_base_url),
            feed_keys,
            webhooks: Webhooks {
                alarm: var("HEARTH_WEBHOOK_ALARM"),
                light_level: var("HEARTH_WEBHOOK_LIGHT_LEVEL"),
                fan: var("HEARTH_WEBHOOK_FAN"),
                fan_speed: var("HEARTH_WEBHOOK_FAN_SPEED"),
            },
            face_service_url: var("HEARTH_FACE_SERVICE_URL").unwrap_or(defaults.face_service_url),
            timeout: http_timeout,
        };

        Ok(Self {
            host: var("HEARTH_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("HEARTH_DB_PATH").unwrap_or_else(|| "hearth.db".into()).into(),
            jwt_secret,
            device_key,
            request_timeout,
            feeds,
            seed_file: var("HEARTH_SEED_FILE").map(PathBuf::from),
        })
    }
}

fn secs(value: Option<String>, default: u64) -> Result<Duration> {
    let secs = match value {
        Some(v) => v.parse::<u64>().context("expected whole seconds")?,
        None => default,
    };
    if secs == 0 {
        bail!("timeout must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}
