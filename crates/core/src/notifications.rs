//! Curator notifications spawned by record creation.

use serde::{Deserialize, Serialize};

use crate::records::Record;
use crate::types::{new_entity_id, EntityId, Timestamp, UserId};

/// Notification kind emitted when a support session logs a new record.
pub const KIND_NEW_RECORD: &str = "new_record";

/// Summary of the record that triggered a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub student: String,
    pub group: String,
    pub theme: String,
}

/// A persisted curator notification.
///
/// `seen` only moves from `false` to `true`, via [`mark_all_seen`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: EntityId,
    pub kind: String,
    pub record_id: EntityId,
    pub actor_id: UserId,
    pub actor_name: String,
    pub payload: NotificationPayload,
    pub created_at: Timestamp,
    pub seen: bool,
}

impl Notification {
    /// Build the notification paired with a freshly created record.
    pub fn for_new_record(record: &Record, now: Timestamp) -> Self {
        Self {
            id: new_entity_id(),
            kind: KIND_NEW_RECORD.to_string(),
            record_id: record.id.clone(),
            actor_id: record.owner_id.clone(),
            actor_name: record.owner_name.clone(),
            payload: NotificationPayload {
                student: record.student.clone(),
                group: record.group.clone(),
                theme: record.theme.clone(),
            },
            created_at: now,
            seen: false,
        }
    }
}

/// Flag every notification as seen. Returns how many changed state.
pub fn mark_all_seen(notifications: &mut [Notification]) -> usize {
    let mut changed = 0;
    for n in notifications.iter_mut().filter(|n| !n.seen) {
        n.seen = true;
        changed += 1;
    }
    changed
}

/// Count notifications not yet seen.
pub fn unseen_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.seen).count()
}
