//! Cross-session propagation of versioned document changes.
//!
//! Every saved write publishes a [`DocumentChanged`] signal on the
//! [`ChangeFeed`]. Each session holding a document keeps a [`DocumentView`]:
//! its last known committed value plus any unsaved edits. A view adopts an
//! incoming value only when its version is strictly newer, so a session
//! never moves backwards.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tutorlog_core::error::CoreError;
use tutorlog_core::merge::{apply_patch, DocumentData};

use crate::document::{VersionedDocument, VersionedStore, WriteOutcome};

// ---------------------------------------------------------------------------
// ChangeFeed
// ---------------------------------------------------------------------------

/// A change signal: the key that changed and the persisted document as raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChanged {
    pub key: String,
    pub raw: String,
    /// Session that made the write.
    pub origin: String,
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process broadcast of [`DocumentChanged`] signals.
///
/// When the buffer is full the oldest signals are dropped and slow receivers
/// observe `RecvError::Lagged`.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<DocumentChanged>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current receivers. Returns how many there were.
    pub fn publish(&self, signal: DocumentChanged) -> usize {
        // Zero receivers is not an error.
        self.sender.send(signal).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChanged> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// DocumentView
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ViewState {
    /// Last committed value this session knows about.
    local: VersionedDocument,
    /// Unsaved edits, overlaid on `local`.
    pending: DocumentData,
}

/// One session's view of a versioned document.
pub struct DocumentView {
    store: VersionedStore,
    session_id: String,
    state: Mutex<ViewState>,
}

impl DocumentView {
    /// Load the current document for `session_id`.
    pub fn open(store: VersionedStore, session_id: impl Into<String>) -> Result<Self, CoreError> {
        let local = store.read()?;
        Ok(Self {
            store,
            session_id: session_id.into(),
            state: Mutex::new(ViewState {
                local,
                pending: DocumentData::new(),
            }),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Committed value with unsaved edits applied.
    pub fn snapshot(&self) -> VersionedDocument {
        let state = self.state.lock();
        VersionedDocument {
            data: apply_patch(&state.local.data, &state.pending),
            ..state.local.clone()
        }
    }

    /// Version of the committed value this view is based on.
    pub fn version(&self) -> u64 {
        self.state.lock().local.version
    }

    /// Record unsaved edits.
    pub fn edit(&self, patch: DocumentData) {
        self.state.lock().pending.extend(patch);
    }

    pub fn has_pending(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    /// Write the unsaved edits.
    ///
    /// On `Saved` the view moves to the new version and drops the edits that
    /// were submitted (edits made while the save was in flight are kept). On
    /// `Conflict` the view moves to the remote version and keeps the merged
    /// document as its unsaved edits, so the next `save` re-submits it.
    pub async fn save(&self) -> Result<WriteOutcome, CoreError> {
        let (base_version, submitted) = {
            let state = self.state.lock();
            (state.local.version, state.pending.clone())
        };

        let outcome = self
            .store
            .write(&self.session_id, base_version, &submitted)
            .await?;

        let mut state = self.state.lock();
        match &outcome {
            WriteOutcome::Saved(saved) => {
                if saved.version >= state.local.version {
                    state.local = saved.clone();
                }
                state
                    .pending
                    .retain(|key, value| submitted.get(key) != Some(value));
            }
            WriteOutcome::Conflict(merged) => {
                if merged.version >= state.local.version {
                    tracing::debug!(
                        session_id = %self.session_id,
                        key = self.store.key(),
                        remote_version = merged.version,
                        "Save conflicted, holding merged edits"
                    );
                    state.local = merged.clone();
                    state.pending = merged.data.clone();
                }
            }
        }
        Ok(outcome)
    }

    /// Discard unsaved edits and take the stored value unless it is older
    /// than what the view already holds.
    pub fn reload(&self) -> Result<VersionedDocument, CoreError> {
        let stored = self.store.read()?;
        let mut state = self.state.lock();
        if stored.version >= state.local.version {
            state.local = stored;
        }
        state.pending.clear();
        Ok(state.local.clone())
    }

    /// Reconcile one incoming change signal.
    ///
    /// Returns `true` when the incoming value was adopted. Signals from this
    /// session, for other keys, with unparseable payloads, or not strictly
    /// newer than the local version are ignored.
    pub fn on_document_changed(&self, key: &str, raw: &str, origin: &str) -> bool {
        if origin == self.session_id || key != self.store.key() {
            return false;
        }

        let incoming: VersionedDocument = match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    key,
                    error = %e,
                    "Ignoring unparseable document signal"
                );
                return false;
            }
        };

        let mut state = self.state.lock();
        if incoming.version <= state.local.version {
            tracing::trace!(
                session_id = %self.session_id,
                key,
                incoming_version = incoming.version,
                local_version = state.local.version,
                "Ignoring stale document signal"
            );
            return false;
        }

        if !state.pending.is_empty() {
            tracing::info!(
                session_id = %self.session_id,
                key,
                discarded = state.pending.len(),
                "Newer remote version replaces unsaved edits"
            );
        }
        state.local = self.store.with_defaults(incoming);
        state.pending.clear();
        true
    }

    pub fn apply_signal(&self, signal: &DocumentChanged) -> bool {
        self.on_document_changed(&signal.key, &signal.raw, &signal.origin)
    }

    /// Follow the change feed until it closes or the view is dropped.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let view: Weak<Self> = Arc::downgrade(self);
        let mut rx = self.store.feed().subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(signal) => {
                        let Some(view) = view.upgrade() else { break };
                        view.apply_signal(&signal);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Document view lagged behind change feed");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
