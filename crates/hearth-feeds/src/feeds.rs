use serde::Deserialize;
use tracing::debug;

use hearth_types::models::HouseId;

use crate::{FeedClient, FeedError};

/// The seven feeds merged into the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Temperature,
    Humidity,
    Light,
    LightLevel,
    Fan,
    FanSpeed,
    Door,
}

impl Feed {
    pub const ALL: [Feed; 7] = [
        Feed::Temperature,
        Feed::Humidity,
        Feed::Light,
        Feed::LightLevel,
        Feed::Fan,
        Feed::FanSpeed,
        Feed::Door,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Snapshot field this feed fills.
    pub fn field(self) -> &'static str {
        match self {
            Feed::Temperature => "temperature",
            Feed::Humidity => "humidity",
            Feed::Light => "light",
            Feed::LightLevel => "light_level",
            Feed::Fan => "fan",
            Feed::FanSpeed => "fan_speed",
            Feed::Door => "door",
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedPoint {
    value: String,
}

impl FeedClient {
    pub fn feed_url(&self, house_id: HouseId, feed: Feed) -> String {
        let base = self
            .config
            .feed_base_url
            .replace("{house_id}", &house_id.to_string());
        format!(
            "{}/{}/data",
            base.trim_end_matches('/'),
            self.config.feed_keys[feed.index()]
        )
    }

    /// Latest raw value of a feed: the `value` of the first element of the
    /// JSON array the feed endpoint returns.
    pub async fn latest_value(&self, house_id: HouseId, feed: Feed) -> Result<String, FeedError> {
        let url = self.feed_url(house_id, feed);
        let resp = self.http.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        let points: Vec<FeedPoint> = serde_json::from_slice(&body)
            .map_err(|e| FeedError::UnexpectedShape(format!("{}: {}", url, e)))?;

        let value = points
            .into_iter()
            .next()
            .map(|p| p.value)
            .ok_or_else(|| FeedError::UnexpectedShape(format!("{}: empty feed", url)))?;

        debug!("feed {} = {:?}", feed.field(), value);
        Ok(value)
    }
}
