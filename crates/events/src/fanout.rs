//! Best-effort fanout of curator events.
//!
//! The write and its persisted notification are the transactional unit;
//! live delivery is layered on top and may be lossy. A subscriber whose
//! queue is closed is logged and pruned, and the publish still succeeds.

use std::sync::Arc;

use crate::event::CuratorEvent;
use crate::registry::ChannelRegistry;

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Publishes events to every current subscriber of a channel.
#[derive(Clone)]
pub struct NotificationFanout {
    registry: Arc<ChannelRegistry>,
}

impl NotificationFanout {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Deliver `event` to all subscribers of `channel`.
    ///
    /// Never blocks on a slow subscriber (queues are unbounded) and never
    /// fails; the report is informational.
    pub async fn publish(&self, channel: &str, event: CuratorEvent) -> DeliveryReport {
        let targets = self.registry.senders_for(channel).await;
        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();

        for (conn_id, sender) in targets {
            match sender.send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    tracing::warn!(
                        conn_id = %conn_id,
                        channel,
                        event_type = event.event_type(),
                        "Subscriber queue closed, dropping live delivery"
                    );
                    report.failed += 1;
                    closed.push(conn_id);
                }
            }
        }

        if !closed.is_empty() {
            let pruned = self.registry.prune_closed(&closed).await;
            tracing::debug!(pruned, channel, "Pruned closed subscribers");
        }

        tracing::debug!(
            channel,
            event_type = event.event_type(),
            record_id = event.record_id(),
            delivered = report.delivered,
            failed = report.failed,
            "Published event"
        );
        report
    }
}
