//! Optimistic concurrency for single-owner documents.
//!
//! A [`VersionedDocument`] carries a monotonically increasing version. A
//! write names the version it was based on: when that still matches the
//! stored version the patch is applied and the version bumps by one; when it
//! does not, nothing is written and the caller gets the remote document with
//! its own non-empty edits merged on top, to review and re-submit.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tutorlog_core::error::CoreError;
use tutorlog_core::locking::{operations, resource_id};
use tutorlog_core::merge::{apply_patch, merge_local_edits, DocumentData};
use tutorlog_core::profile::{profile_key, Profile};
use tutorlog_core::types::Timestamp;
use tutorlog_store::{KeyValueStore, SharedStore, StoreError};

use crate::lock::LockService;
use crate::sync::{ChangeFeed, DocumentChanged};

/// A document body plus its version counter, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionedDocument {
    pub data: DocumentData,
    pub version: u64,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// Result of [`VersionedStore::write`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The patch was applied and persisted.
    Saved(VersionedDocument),
    /// The base version was stale. Carries the remote document with the
    /// patch's non-empty fields merged over it; the store is unchanged.
    Conflict(VersionedDocument),
}

impl WriteOutcome {
    pub fn document(&self) -> &VersionedDocument {
        match self {
            Self::Saved(doc) | Self::Conflict(doc) => doc,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Versioned access to one document key.
#[derive(Clone)]
pub struct VersionedStore {
    key: Arc<str>,
    defaults: Arc<DocumentData>,
    store: SharedStore,
    locks: LockService,
    feed: ChangeFeed,
}

impl VersionedStore {
    pub fn new(
        key: impl Into<Arc<str>>,
        defaults: DocumentData,
        store: SharedStore,
        locks: LockService,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            key: key.into(),
            defaults: Arc::new(defaults),
            store,
            locks,
            feed,
        }
    }

    /// `owner`'s profile document under `profile:<owner>`.
    pub fn profile(owner: &str, store: SharedStore, locks: LockService, feed: ChangeFeed) -> Self {
        Self::new(
            profile_key(owner),
            Profile::default().to_document(),
            store,
            locks,
            feed,
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Current document. An absent key reads as version 0 with the defaults.
    pub fn read(&self) -> Result<VersionedDocument, CoreError> {
        Ok(self.read_from(self.store.as_ref())?)
    }

    fn read_from(&self, store: &dyn KeyValueStore) -> Result<VersionedDocument, StoreError> {
        match store.get(&self.key)? {
            Some(value) => {
                let stored: VersionedDocument = serde_json::from_value(value)?;
                Ok(self.with_defaults(stored))
            }
            None => Ok(VersionedDocument {
                data: (*self.defaults).clone(),
                version: 0,
                updated_at: None,
            }),
        }
    }

    /// Fill fields missing from `doc` with the defaults.
    pub(crate) fn with_defaults(&self, doc: VersionedDocument) -> VersionedDocument {
        VersionedDocument {
            data: apply_patch(&self.defaults, &doc.data),
            ..doc
        }
    }

    /// Write `patch` on top of the document at `base_version`.
    ///
    /// Runs under the `document:<key>` lock. `origin` identifies the writing
    /// session and is stamped on the change signal so that session can skip
    /// its own echo.
    pub async fn write(
        &self,
        origin: &str,
        base_version: u64,
        patch: &DocumentData,
    ) -> Result<WriteOutcome, CoreError> {
        let lock_id = resource_id(operations::DOCUMENT, &self.key);

        self.locks
            .with_lock(&lock_id, || async {
                let current = self.read_from(self.store.as_ref())?;

                if current.version != base_version {
                    tracing::info!(
                        key = %self.key,
                        base_version,
                        remote_version = current.version,
                        origin,
                        "Version conflict, returning merged document"
                    );
                    return Ok(WriteOutcome::Conflict(VersionedDocument {
                        data: merge_local_edits(&current.data, patch),
                        ..current
                    }));
                }

                let saved = VersionedDocument {
                    data: apply_patch(&current.data, patch),
                    version: current.version + 1,
                    updated_at: Some(Utc::now()),
                };
                let value = serde_json::to_value(&saved).map_err(StoreError::from)?;
                let raw = value.to_string();
                self.store.set(&self.key, value)?;

                tracing::debug!(key = %self.key, version = saved.version, origin, "Document saved");

                self.feed.publish(DocumentChanged {
                    key: self.key.to_string(),
                    raw,
                    origin: origin.to_string(),
                });

                Ok::<_, CoreError>(WriteOutcome::Saved(saved))
            })
            .await
    }
}
