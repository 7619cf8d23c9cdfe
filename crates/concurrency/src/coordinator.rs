//! Serialized record writes with notification persistence and fanout.
//!
//! Every mutating operation runs inside [`LockService::with_lock`] on a
//! resource id derived from the operation and its target. Inside the lock
//! the current state is read, ownership and existence are checked, the new
//! state is persisted, and only then is the event fanned out to curators.

use chrono::Utc;
use tutorlog_core::autofill::AutofillHint;
use tutorlog_core::channels::CHANNEL_CURATORS;
use tutorlog_core::error::CoreError;
use tutorlog_core::locking::{operations, resource_id};
use tutorlog_core::notifications::Notification;
use tutorlog_core::records::{NewRecord, Record, RecordFilter, RecordPatch, ENTITY_RECORD};
use tutorlog_core::roles::Session;
use tutorlog_events::{CuratorEvent, NotificationFanout};
use tutorlog_store::repositories::{NotificationRepo, RecordRepo, StudentRepo};
use tutorlog_store::SharedStore;

use crate::lock::LockService;

/// Entry point for record writes and the read side around them.
#[derive(Clone)]
pub struct WriteCoordinator {
    store: SharedStore,
    locks: LockService,
    fanout: NotificationFanout,
}

impl WriteCoordinator {
    pub fn new(store: SharedStore, locks: LockService, fanout: NotificationFanout) -> Self {
        Self {
            store,
            locks,
            fanout,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn locks(&self) -> &LockService {
        &self.locks
    }

    pub fn fanout(&self) -> &NotificationFanout {
        &self.fanout
    }

    /// Create a record owned by `session` and its curator notification.
    pub async fn submit(&self, session: &Session, payload: NewRecord) -> Result<Record, CoreError> {
        payload.validate()?;
        let lock_id = resource_id(operations::RECORD_SUBMIT, &session.user_id);

        self.locks
            .with_lock(&lock_id, || async move {
                let now = Utc::now();
                let record = Record::create(session, payload, now);
                RecordRepo::insert(self.store.as_ref(), &record)?;

                let notification = Notification::for_new_record(&record, now);
                if let Err(e) = NotificationRepo::insert(self.store.as_ref(), &notification) {
                    // Keep record and notification paired: undo the record.
                    if let Err(undo) = RecordRepo::delete(self.store.as_ref(), &record.id) {
                        tracing::warn!(
                            record_id = %record.id,
                            error = %undo,
                            "Failed to roll back record after notification write failed"
                        );
                    }
                    return Err(e.into());
                }

                tracing::info!(
                    record_id = %record.id,
                    owner_id = %record.owner_id,
                    student = %record.student,
                    "Record submitted"
                );

                self.fanout
                    .publish(
                        CHANNEL_CURATORS,
                        CuratorEvent::RecordCreated {
                            record: record.clone(),
                            notification,
                        },
                    )
                    .await;

                Ok::<_, CoreError>(record)
            })
            .await
    }

    /// Replace the patched fields of a record owned by `session`.
    pub async fn update(
        &self,
        session: &Session,
        id: &str,
        patch: RecordPatch,
    ) -> Result<Record, CoreError> {
        let lock_id = resource_id(operations::RECORD_UPDATE, id);

        self.locks
            .with_lock(&lock_id, || async {
                let mut record = self.owned_record(session, id, "update")?;
                patch.apply(&mut record);

                if !RecordRepo::replace(self.store.as_ref(), &record)? {
                    // Deleted between read and write.
                    return Err(not_found(id));
                }

                tracing::info!(record_id = %id, owner_id = %session.user_id, "Record updated");

                self.fanout
                    .publish(
                        CHANNEL_CURATORS,
                        CuratorEvent::RecordUpdated {
                            record: record.clone(),
                        },
                    )
                    .await;

                Ok::<_, CoreError>(record)
            })
            .await
    }

    /// Hard-delete a record owned by `session`.
    pub async fn delete(&self, session: &Session, id: &str) -> Result<(), CoreError> {
        let lock_id = resource_id(operations::RECORD_DELETE, id);

        self.locks
            .with_lock(&lock_id, || async {
                self.owned_record(session, id, "delete")?;

                if !RecordRepo::delete(self.store.as_ref(), id)? {
                    return Err(not_found(id));
                }

                tracing::info!(record_id = %id, owner_id = %session.user_id, "Record deleted");

                self.fanout
                    .publish(
                        CHANNEL_CURATORS,
                        CuratorEvent::RecordDeleted { id: id.to_string() },
                    )
                    .await;

                Ok::<_, CoreError>(())
            })
            .await
    }

    /// Records matching `filter`, newest first. Reads without locking.
    pub fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, CoreError> {
        Ok(RecordRepo::list_filtered(self.store.as_ref(), filter)?)
    }

    /// All notifications, newest first. Curator only.
    pub fn list_notifications(&self, session: &Session) -> Result<Vec<Notification>, CoreError> {
        session.require_curator()?;
        Ok(NotificationRepo::list(self.store.as_ref())?)
    }

    /// Flag every notification as seen and return the updated list. Curator only.
    pub async fn mark_all_seen(&self, session: &Session) -> Result<Vec<Notification>, CoreError> {
        session.require_curator()?;

        self.locks
            .with_lock(operations::NOTIFICATIONS_SEEN, || async {
                let changed = NotificationRepo::mark_all_seen(self.store.as_ref())?;
                tracing::info!(changed, curator_id = %session.user_id, "Notifications marked seen");
                Ok::<_, CoreError>(NotificationRepo::list(self.store.as_ref())?)
            })
            .await
    }

    /// Group, mentor and status of the student best matching `name`.
    pub fn autofill(&self, name: &str) -> Result<Option<AutofillHint>, CoreError> {
        Ok(StudentRepo::autofill(self.store.as_ref(), name)?)
    }

    /// Load a record and check that `session` owns it.
    fn owned_record(&self, session: &Session, id: &str, action: &str) -> Result<Record, CoreError> {
        let record = RecordRepo::find_by_id(self.store.as_ref(), id)?.ok_or_else(|| not_found(id))?;

        if !record.is_owned_by(&session.user_id) {
            tracing::warn!(
                record_id = %id,
                owner_id = %record.owner_id,
                requester_id = %session.user_id,
                action,
                "Rejected write by non-owner"
            );
            return Err(CoreError::Forbidden(format!(
                "Only the owner can {action} this record"
            )));
        }
        Ok(record)
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: ENTITY_RECORD,
        id: id.to_string(),
    }
}
