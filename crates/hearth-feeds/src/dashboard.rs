//! Merge the house feeds into one [`DashboardSnapshot`].
//!
//! All feeds are read concurrently. A feed that cannot be read leaves its
//! field at the default and is named in `degraded`; a value that reads fine
//! but does not parse as a number becomes `0.0` without being marked, which
//! is how the devices report "no reading yet".

use futures_util::future::join_all;
use tracing::warn;

use hearth_types::models::{DashboardSnapshot, HouseId};

use crate::actuators::{ALARM_ON, DOOR_OPEN, FAN_ON};
use crate::{Feed, FeedClient};

pub async fn snapshot(client: &FeedClient, house_id: HouseId) -> DashboardSnapshot {
    let reads = Feed::ALL
        .map(|feed| async move { (feed, client.latest_value(house_id, feed).await) });

    let mut snapshot = DashboardSnapshot::default();
    for (feed, result) in join_all(reads).await {
        match result {
            Ok(raw) => apply(&mut snapshot, feed, &raw),
            Err(e) => {
                warn!("house {}: feed {} unavailable: {}", house_id, feed.field(), e);
                snapshot.degraded.push(feed.field().to_string());
            }
        }
    }
    snapshot
}

/// Map one raw feed value onto its snapshot field.
pub fn apply(snapshot: &mut DashboardSnapshot, feed: Feed, raw: &str) {
    match feed {
        Feed::Temperature => snapshot.temperature = parse_number(raw),
        Feed::Humidity => snapshot.humidity = parse_number(raw),
        Feed::Light => snapshot.light = raw == ALARM_ON,
        Feed::LightLevel => snapshot.light_level = parse_number(raw),
        Feed::Fan => snapshot.fan = raw == FAN_ON,
        Feed::FanSpeed => snapshot.fan_speed = parse_number(raw),
        Feed::Door => snapshot.door = raw == DOOR_OPEN,
    }
}

/// Parse a feed value as a number; anything unparsable reads as `0.0`.
pub fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}
