//! In-process activity bus and the per-house WebSocket that streams it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use hearth_types::events::HouseEvent;
use hearth_types::models::{ActivityLog, HouseId, UserId};

use crate::auth::{AppState, verify_token};
use crate::error::ApiError;
use crate::middleware::ensure_owner;

/// Server sends a Ping this often; two missed Pongs drop the socket.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Fan-out of freshly written activity entries to connected sockets.
#[derive(Clone)]
pub struct ActivityBus {
    tx: broadcast::Sender<ActivityLog>,
}

impl ActivityBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityLog> {
        self.tx.subscribe()
    }

    /// Never blocks and never fails; with no subscribers the entry is dropped.
    pub fn publish(&self, entry: ActivityLog) {
        let _ = self.tx.send(entry);
    }
}

impl Default for ActivityBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    token: String,
}

/// Browsers cannot set headers on a WebSocket upgrade, so the token travels
/// in the query string and is checked before upgrading.
pub async fn house_events(
    State(state): State<AppState>,
    Path(house_id): Path<HouseId>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let claims = verify_token(&state.jwt_secret, &query.token).map_err(|e| {
        debug!("events upgrade rejected: {}", e);
        ApiError::Unauthorized
    })?;
    ensure_owner(&state, claims.sub, house_id).await?;

    let rx = state.activity.subscribe();
    Ok(ws.on_upgrade(move |socket| stream_house(socket, rx, claims.sub, house_id)))
}

async fn stream_house(
    socket: WebSocket,
    mut rx: broadcast::Receiver<ActivityLog>,
    user_id: UserId,
    house_id: HouseId,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("user {} watching house {}", user_id, house_id);

    if send_event(&mut sender, &HouseEvent::Ready { house_id }).await.is_err() {
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = rx.recv() => {
                    let entry = match result {
                        Ok(entry) => entry,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("house {} socket lagged by {} entries", house_id, n);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };
                    if entry.house_id != house_id {
                        continue;
                    }
                    if send_event(&mut sender, &HouseEvent::Activity(entry)).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_received.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!(
                                "house {} socket missed {} pongs, dropping",
                                house_id, missed_heartbeats
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Clients have nothing to say; only Pong and Close matter.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => pong_flag_recv.store(true, Ordering::Release),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("user {} stopped watching house {}", user_id, house_id);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &HouseEvent,
) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|e| {
        warn!("event serialization failed: {}", e);
    })?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
