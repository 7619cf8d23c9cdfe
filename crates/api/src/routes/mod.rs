pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws        WebSocket (record writes, notifications, profile, live events)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws::ws_handler))
}
