use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;
use crate::ws::dispatch::{handle_text, relay_change, Connection};

/// Interval between heartbeat pings (in seconds).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Registers the connection with the channel registry, then multiplexes on
/// one task:
///   1. inbound frames, answered with a reply frame;
///   2. curator events queued for this connection;
///   3. changes to this user's profile made by other connections;
///   4. periodic heartbeat pings.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut conn = Connection::new(uuid::Uuid::new_v4().to_string());
    tracing::info!(conn_id = %conn.conn_id, "WebSocket connected");

    let mut events = state.registry.add(conn.conn_id.clone(), None).await;
    let mut changes = state.profile_feed.subscribe();

    let (mut sink, mut stream) = socket.split();

    let period = Duration::from_secs(HEARTBEAT_INTERVAL_SECS);
    let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_text(&state, &mut conn, text.as_str()).await;
                    if send_json(&mut sink, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn.conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn.conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },

            event = events.recv() => match event {
                Some(event) => {
                    if send_json(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                // Registry dropped this connection (shutdown).
                None => break,
            },

            change = changes.recv() => match change {
                Ok(signal) => {
                    if let Some(push) = relay_change(&conn, &signal) {
                        if send_json(&mut sink, &push).await.is_err() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(conn_id = %conn.conn_id, skipped, "Profile change relay lagged");
                }
                Err(RecvError::Closed) => break,
            },

            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    tracing::debug!(conn_id = %conn.conn_id, "WebSocket sink closed");
                    break;
                }
            }
        }
    }

    state.registry.remove(&conn.conn_id).await;
    tracing::info!(conn_id = %conn.conn_id, "WebSocket disconnected");
}

async fn send_json<T: Serialize>(
    sink: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(value) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize outbound frame");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await
}
