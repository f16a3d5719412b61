use serde::{Deserialize, Serialize};

use crate::models::{ActivityLog, HouseId};

/// Events pushed over the per-house activity WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HouseEvent {
    /// Sent once after the socket is accepted
    Ready { house_id: HouseId },

    /// A new activity log entry was written
    Activity(ActivityLog),
}
