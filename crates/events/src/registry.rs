use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use tutorlog_core::types::{Timestamp, UserId};

use crate::event::CuratorEvent;

/// Channel sender half for pushing events to one connected session.
pub type EventSender = mpsc::UnboundedSender<CuratorEvent>;

/// Receiver half handed to the transport that owns the connection.
pub type EventReceiver = mpsc::UnboundedReceiver<CuratorEvent>;

/// Metadata for a single connected session.
pub struct Subscriber {
    /// Authenticated user, once the session has identified itself.
    pub user_id: Option<UserId>,
    /// Channels this connection receives events for.
    pub channels: HashSet<String>,
    /// Outbound queue for this connection.
    pub sender: EventSender,
    /// When this connection was registered.
    pub connected_at: Timestamp,
}

/// Tracks every connected session and its channel memberships.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct ChannelRegistry {
    subscribers: RwLock<HashMap<String, Subscriber>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection with no channel memberships.
    ///
    /// Re-registering an existing id replaces the previous connection.
    pub async fn add(&self, conn_id: impl Into<String>, user_id: Option<UserId>) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            user_id,
            channels: HashSet::new(),
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.subscribers.write().await.insert(conn_id.into(), subscriber);
        rx
    }

    /// Register a connection already joined to `channel`.
    pub async fn subscribe(&self, channel: &str, conn_id: impl Into<String>) -> EventReceiver {
        let conn_id = conn_id.into();
        let rx = self.add(conn_id.clone(), None).await;
        self.join(&conn_id, channel).await;
        rx
    }

    /// Record the authenticated user for a connection.
    pub async fn identify(&self, conn_id: &str, user_id: UserId) -> bool {
        match self.subscribers.write().await.get_mut(conn_id) {
            Some(sub) => {
                sub.user_id = Some(user_id);
                true
            }
            None => false,
        }
    }

    /// Add a connection to a channel. Returns `false` for unknown connections.
    pub async fn join(&self, conn_id: &str, channel: &str) -> bool {
        match self.subscribers.write().await.get_mut(conn_id) {
            Some(sub) => {
                sub.channels.insert(channel.to_string());
                true
            }
            None => false,
        }
    }

    pub async fn leave(&self, conn_id: &str, channel: &str) {
        if let Some(sub) = self.subscribers.write().await.get_mut(conn_id) {
            sub.channels.remove(channel);
        }
    }

    /// Remove a connection. Unknown ids are a no-op.
    pub async fn remove(&self, conn_id: &str) {
        self.subscribers.write().await.remove(conn_id);
    }

    /// Senders for every connection joined to `channel`, with their ids.
    pub(crate) async fn senders_for(&self, channel: &str) -> Vec<(String, EventSender)> {
        self.subscribers
            .read()
            .await
            .iter()
            .filter(|(_, sub)| sub.channels.contains(channel))
            .map(|(id, sub)| (id.clone(), sub.sender.clone()))
            .collect()
    }

    /// Remove the given connections if their queues are still closed.
    pub(crate) async fn prune_closed(&self, conn_ids: &[String]) -> usize {
        let mut subs = self.subscribers.write().await;
        let mut pruned = 0;
        for id in conn_ids {
            if subs.get(id).is_some_and(|sub| sub.sender.is_closed()) {
                subs.remove(id);
                pruned += 1;
            }
        }
        pruned
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.subscribers
            .read()
            .await
            .values()
            .filter(|sub| sub.channels.contains(channel))
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Connection ids belonging to a user.
    pub async fn get_by_user(&self, user_id: &str) -> Vec<String> {
        self.subscribers
            .read()
            .await
            .iter()
            .filter(|(_, sub)| sub.user_id.as_deref() == Some(user_id))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop every connection, closing their queues.
    pub async fn shutdown_all(&self) {
        let mut subs = self.subscribers.write().await;
        let count = subs.len();
        subs.clear();
        tracing::info!(count, "Closed all subscriber queues");
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
