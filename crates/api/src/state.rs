use std::sync::Arc;

use tutorlog_concurrency::{ChangeFeed, LockService, VersionedStore, WriteCoordinator};
use tutorlog_events::{ChannelRegistry, NotificationFanout};
use tutorlog_store::SharedStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Document store.
    pub store: SharedStore,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-connection subscriber channels (browser clients).
    pub registry: Arc<ChannelRegistry>,
    /// Lock table shared by every write path.
    pub locks: LockService,
    /// Record writes, notifications and curator fanout.
    pub coordinator: WriteCoordinator,
    /// Change signals for every user's profile document.
    pub profile_feed: ChangeFeed,
}

impl AppState {
    /// Wire every service around `store`.
    pub fn new(store: SharedStore, config: ServerConfig) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let locks = LockService::new(config.locks.clone());
        let coordinator = WriteCoordinator::new(
            Arc::clone(&store),
            locks.clone(),
            NotificationFanout::new(Arc::clone(&registry)),
        );

        Self {
            store,
            config: Arc::new(config),
            registry,
            locks,
            coordinator,
            profile_feed: ChangeFeed::default(),
        }
    }

    /// Versioned access to `owner`'s profile document.
    pub fn profile(&self, owner: &str) -> VersionedStore {
        VersionedStore::profile(
            owner,
            Arc::clone(&self.store),
            self.locks.clone(),
            self.profile_feed.clone(),
        )
    }
}
