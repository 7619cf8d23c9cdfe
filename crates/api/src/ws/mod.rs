//! WebSocket transport.
//!
//! One socket per browser session: inbound frames are dispatched to the
//! write path, and curator events plus profile changes are pushed out.

pub mod dispatch;
mod handler;
pub mod protocol;

pub use dispatch::{dispatch, handle_text, relay_change, Connection};
pub use handler::{ws_handler, HEARTBEAT_INTERVAL_SECS};
