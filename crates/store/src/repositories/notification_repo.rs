//! Repository for the `notifications` document.

use tutorlog_core::notifications::{self, Notification};

use crate::{keys, modify, read_or_default, KeyValueStore, StoreError};

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// All notifications, newest first.
    pub fn list(store: &dyn KeyValueStore) -> Result<Vec<Notification>, StoreError> {
        let mut list: Vec<Notification> = read_or_default(store, keys::NOTIFICATIONS)?;
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    pub fn insert(store: &dyn KeyValueStore, notification: &Notification) -> Result<(), StoreError> {
        modify(store, keys::NOTIFICATIONS, |list: &mut Vec<Notification>| {
            list.push(notification.clone());
            Ok(())
        })
    }

    /// Flag every notification as seen.
    ///
    /// Returns the number of notifications that changed state.
    pub fn mark_all_seen(store: &dyn KeyValueStore) -> Result<usize, StoreError> {
        modify(store, keys::NOTIFICATIONS, |list: &mut Vec<Notification>| {
            Ok(notifications::mark_all_seen(list))
        })
    }

    pub fn unseen_count(store: &dyn KeyValueStore) -> Result<usize, StoreError> {
        let list: Vec<Notification> = read_or_default(store, keys::NOTIFICATIONS)?;
        Ok(notifications::unseen_count(&list))
    }
}
