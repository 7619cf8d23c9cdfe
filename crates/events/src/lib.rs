//! Tutorlog curator event fanout.
//!
//! - [`CuratorEvent`]: the wire envelope for accepted record writes.
//! - [`ChannelRegistry`]: connected sessions and the channels they joined,
//!   each with its own unbounded outbound queue.
//! - [`NotificationFanout`]: best-effort delivery of an event to every
//!   subscriber of a channel. Delivery failures are logged, never returned.

pub mod event;
pub mod fanout;
pub mod registry;

pub use event::CuratorEvent;
pub use fanout::{DeliveryReport, NotificationFanout};
pub use registry::{ChannelRegistry, EventReceiver, EventSender};
