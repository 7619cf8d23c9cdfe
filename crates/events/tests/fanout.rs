//! Tests for `ChannelRegistry` membership and `NotificationFanout` delivery.
//!
//! These exercise the registry and fanout directly, without any transport.
//! They verify add/remove semantics, channel scoping and that a closed
//! subscriber never prevents delivery to the others.

use std::sync::Arc;

use assert_matches::assert_matches;
use tutorlog_core::channels::CHANNEL_CURATORS;
use tutorlog_events::{ChannelRegistry, CuratorEvent, DeliveryReport, NotificationFanout};

fn deleted(id: &str) -> CuratorEvent {
    CuratorEvent::RecordDeleted { id: id.to_string() }
}

fn fanout() -> NotificationFanout {
    NotificationFanout::new(Arc::new(ChannelRegistry::new()))
}

// ---------------------------------------------------------------------------
// Test: new registry starts empty
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_registry_has_zero_connections() {
    let registry = ChannelRegistry::new();

    assert_eq!(registry.connection_count().await, 0);
    assert_eq!(registry.subscriber_count(CHANNEL_CURATORS).await, 0);
}

// ---------------------------------------------------------------------------
// Test: subscribe() registers and joins in one step
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribe_joins_channel() {
    let registry = ChannelRegistry::new();

    let _rx = registry.subscribe(CHANNEL_CURATORS, "conn-1").await;

    assert_eq!(registry.connection_count().await, 1);
    assert_eq!(registry.subscriber_count(CHANNEL_CURATORS).await, 1);
    assert_eq!(registry.subscriber_count("support:u1").await, 0);
}

// ---------------------------------------------------------------------------
// Test: remove() with unknown ID is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_unknown_id_is_noop() {
    let registry = ChannelRegistry::new();

    let _rx = registry.add("conn-1", None).await;
    registry.remove("nonexistent").await;

    assert_eq!(registry.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: join on an unknown connection reports false
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_unknown_connection_fails() {
    let registry = ChannelRegistry::new();

    assert!(!registry.join("ghost", CHANNEL_CURATORS).await);
    assert!(!registry.identify("ghost", "u1".into()).await);
}

// ---------------------------------------------------------------------------
// Test: publish reaches every subscriber of the channel and nobody else
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_is_scoped_to_channel() {
    let fanout = fanout();
    let registry = fanout.registry();

    let mut curator_a = registry.subscribe(CHANNEL_CURATORS, "conn-a").await;
    let mut curator_b = registry.subscribe(CHANNEL_CURATORS, "conn-b").await;
    let mut support = registry.subscribe("support:u1", "conn-s").await;

    let report = fanout.publish(CHANNEL_CURATORS, deleted("r1")).await;
    assert_eq!(
        report,
        DeliveryReport {
            delivered: 2,
            failed: 0
        }
    );

    assert_eq!(curator_a.recv().await, Some(deleted("r1")));
    assert_eq!(curator_b.recv().await, Some(deleted("r1")));
    assert_matches!(support.try_recv(), Err(_));
}

// ---------------------------------------------------------------------------
// Test: a closed subscriber is pruned and does not block the rest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_subscriber_is_pruned() {
    let fanout = fanout();
    let registry = fanout.registry();

    let dropped = registry.subscribe(CHANNEL_CURATORS, "conn-1").await;
    let mut alive = registry.subscribe(CHANNEL_CURATORS, "conn-2").await;
    drop(dropped);

    let report = fanout.publish(CHANNEL_CURATORS, deleted("r2")).await;
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);

    assert_eq!(alive.recv().await, Some(deleted("r2")));
    assert_eq!(registry.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: publish with no subscribers is harmless
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_without_subscribers() {
    let fanout = fanout();

    let report = fanout.publish(CHANNEL_CURATORS, deleted("r3")).await;
    assert_eq!(report, DeliveryReport::default());
}

// ---------------------------------------------------------------------------
// Test: leave() stops delivery for that channel only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leave_stops_delivery() {
    let fanout = fanout();
    let registry = fanout.registry();

    let mut rx = registry.subscribe(CHANNEL_CURATORS, "conn-1").await;
    registry.join("conn-1", "support:u1").await;
    registry.leave("conn-1", CHANNEL_CURATORS).await;

    fanout.publish(CHANNEL_CURATORS, deleted("r4")).await;
    fanout.publish("support:u1", deleted("r5")).await;

    assert_eq!(rx.recv().await, Some(deleted("r5")));
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() closes every queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_closes_queues() {
    let registry = ChannelRegistry::new();

    let mut rx1 = registry.subscribe(CHANNEL_CURATORS, "conn-1").await;
    let mut rx2 = registry.add("conn-2", Some("u2".into())).await;
    assert_eq!(registry.get_by_user("u2").await, vec!["conn-2".to_string()]);

    registry.shutdown_all().await;

    assert_eq!(registry.connection_count().await, 0);
    assert!(rx1.recv().await.is_none());
    assert!(rx2.recv().await.is_none());
}
