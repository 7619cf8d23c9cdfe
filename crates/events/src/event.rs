//! Events pushed to curator subscribers.

use serde::{Deserialize, Serialize};
use tutorlog_core::notifications::Notification;
use tutorlog_core::records::Record;
use tutorlog_core::types::EntityId;

/// An accepted record write, as seen by observers.
///
/// Serialized as JSON with an internally-tagged `"type"` discriminator so
/// that clients can route messages by type string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CuratorEvent {
    #[serde(rename = "record.created")]
    RecordCreated {
        record: Record,
        notification: Notification,
    },

    #[serde(rename = "record.updated")]
    RecordUpdated { record: Record },

    /// Carries only the id; the record no longer exists.
    #[serde(rename = "record.deleted")]
    RecordDeleted { id: EntityId },
}

impl CuratorEvent {
    /// Dot-separated event name, matching the serialized `"type"` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            CuratorEvent::RecordCreated { .. } => "record.created",
            CuratorEvent::RecordUpdated { .. } => "record.updated",
            CuratorEvent::RecordDeleted { .. } => "record.deleted",
        }
    }

    /// Id of the record the event concerns.
    pub fn record_id(&self) -> &str {
        match self {
            CuratorEvent::RecordCreated { record, .. } | CuratorEvent::RecordUpdated { record } => {
                &record.id
            }
            CuratorEvent::RecordDeleted { id } => id,
        }
    }
}
