use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{BroadcastError, DedupCache, RoomBroadcaster};
use crate::models::QueueMessage;

/// Idempotent entry point for the queue consumer.
///
/// The upstream queue delivers at least once, so the same `messageId` may be
/// triggered more than once. Within the dedup window only the first trigger
/// broadcasts; later ones return the first result without sending.
pub struct BroadcastTrigger {
    dedup: DedupCache,
    broadcaster: Arc<RoomBroadcaster>,
}

impl BroadcastTrigger {
    pub fn new(dedup: DedupCache, broadcaster: RoomBroadcaster) -> Self {
        Self { dedup, broadcaster: Arc::new(broadcaster) }
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.dedup
    }

    /// Broadcast `message` once per `messageId` and return the recipient count.
    ///
    /// The dedup and broadcast step runs on its own task. Dropping the returned
    /// future does not cancel it, so the result is still recorded and a retry
    /// of the same id does not send again.
    pub async fn trigger(&self, message: &QueueMessage) -> Result<usize, BroadcastError> {
        let missing = message.missing_fields();
        if !missing.is_empty() {
            return Err(BroadcastError::MalformedInput(missing));
        }

        let dedup = self.dedup.clone();
        let broadcaster = self.broadcaster.clone();
        let owned = message.clone();
        let task = tokio::spawn(async move {
            dedup
                .get_or_try_record(&owned.message_id, broadcaster.broadcast_to_room(&owned))
                .await
        });

        let recorded = task
            .await
            .map_err(|e| {
                warn!("Broadcast task for message {} did not finish: {}", message.message_id, e);
                BroadcastError::Interrupted(e.to_string())
            })?
            .map_err(|e| (*e).clone())?;

        if recorded.is_duplicate() {
            info!(
                "Duplicate trigger for message {} in room {}, skipping (first seen {})",
                message.message_id,
                message.room_id,
                recorded.entry().seen_at.to_rfc3339()
            );
        } else {
            debug!(
                "Broadcast message {} to {} client(s) in room {}",
                message.message_id,
                recorded.recipient_count(),
                message.room_id
            );
        }
        Ok(recorded.recipient_count())
    }
}

/// Build the engine with the registry shared with the transport layer.
pub fn build(
    registry: Arc<super::ConnectionRegistry>,
    dedup: DedupCache,
    send_timeout: std::time::Duration,
) -> BroadcastTrigger {
    BroadcastTrigger::new(dedup, RoomBroadcaster::new(registry, send_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::broadcaster::tests::message;
    use crate::fanout::connection::testing::{Behavior, FakeConnection};
    use crate::fanout::{Connection, ConnectionRegistry};
    use std::time::Duration;

    fn engine() -> (Arc<ConnectionRegistry>, BroadcastTrigger) {
        let registry = Arc::new(ConnectionRegistry::new());
        let trigger = build(
            registry.clone(),
            DedupCache::new(Duration::from_secs(60), 1000),
            Duration::from_millis(100),
        );
        (registry, trigger)
    }

    fn connect(registry: &ConnectionRegistry, id: &str, rooms: &[&str]) -> Arc<FakeConnection> {
        let conn = FakeConnection::open(id);
        registry.register(conn.clone());
        for room in rooms {
            registry.join(conn.id(), room).unwrap();
        }
        conn
    }

    #[tokio::test]
    async fn fresh_message_reaches_every_member() {
        let (registry, trigger) = engine();
        let conns: Vec<_> = (1..=4).map(|i| connect(&registry, &format!("c{i}"), &["r1"])).collect();
        let msg = message("m1", "r1");

        assert_eq!(trigger.trigger(&msg).await, Ok(4));
        let expected = serde_json::to_string(&msg).unwrap();
        for conn in &conns {
            assert_eq!(conn.received(), vec![expected.clone()]);
        }
    }

    #[tokio::test]
    async fn duplicate_trigger_returns_cached_count_without_resending() {
        let (registry, trigger) = engine();
        let c1 = connect(&registry, "c1", &["r1"]);
        let c2 = connect(&registry, "c2", &["r1"]);
        let msg = message("m1", "r1");

        assert_eq!(trigger.trigger(&msg).await, Ok(2));
        registry.remove(c2.id());
        assert_eq!(trigger.trigger(&msg).await, Ok(2));

        assert_eq!(c1.received().len(), 1);
        assert_eq!(c2.received().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_duplicates_deliver_once() {
        let (registry, trigger) = engine();
        let trigger = Arc::new(trigger);
        let c1 = connect(&registry, "c1", &["r1"]);
        let msg = message("m1", "r1");

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let trigger = trigger.clone();
            let msg = msg.clone();
            tasks.push(tokio::spawn(async move { trigger.trigger(&msg).await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(1));
        }
        assert_eq!(c1.received().len(), 1);
    }

    #[tokio::test]
    async fn leave_excludes_member_from_later_broadcasts() {
        let (registry, trigger) = engine();
        let c1 = connect(&registry, "c1", &["r1"]);
        let c2 = connect(&registry, "c2", &["r1"]);
        registry.leave(c2.id(), "r1");

        assert_eq!(trigger.trigger(&message("m1", "r1")).await, Ok(1));
        assert_eq!(c1.received().len(), 1);
        assert!(c2.received().is_empty());
    }

    #[tokio::test]
    async fn disconnect_between_messages_shrinks_audience() {
        let (registry, trigger) = engine();
        let c1 = connect(&registry, "c1", &["r1"]);
        let c2 = connect(&registry, "c2", &["r1"]);

        assert_eq!(trigger.trigger(&message("m1", "r1")).await, Ok(2));
        c2.close();
        registry.remove(c2.id());
        assert_eq!(trigger.trigger(&message("m2", "r1")).await, Ok(1));

        assert_eq!(c1.received().len(), 2);
        assert_eq!(c2.received().len(), 1);
    }

    #[tokio::test]
    async fn empty_room_is_not_an_error() {
        let (_registry, trigger) = engine();
        assert_eq!(trigger.trigger(&message("m1", "nobody-here")).await, Ok(0));
    }

    #[tokio::test]
    async fn malformed_input_never_reaches_the_broadcaster() {
        let (registry, trigger) = engine();
        let c1 = connect(&registry, "c1", &["r1"]);
        let mut msg = message("", "r1");
        msg.user_id = String::new();

        assert_eq!(
            trigger.trigger(&msg).await,
            Err(BroadcastError::MalformedInput(vec!["messageId", "userId"]))
        );
        assert!(c1.received().is_empty());
    }

    #[tokio::test]
    async fn room_resolution_failure_is_surfaced_and_not_cached() {
        let (_registry, trigger) = engine();
        let msg = message("m1", "bad\u{7}room");

        assert!(matches!(trigger.trigger(&msg).await, Err(BroadcastError::RoomResolution(_))));
        assert!(trigger.dedup().lookup("m1").await.is_none());
    }

    #[tokio::test]
    async fn abandoned_trigger_still_records_and_retry_does_not_resend() {
        let (registry, trigger) = engine();
        let good = connect(&registry, "good", &["r1"]);
        let slow = FakeConnection::with_behavior("slow", Behavior::Stall);
        registry.register(slow.clone());
        registry.join(slow.id(), "r1").unwrap();
        let msg = message("m1", "r1");

        let abandoned = tokio::time::timeout(Duration::from_millis(20), trigger.trigger(&msg)).await;
        assert!(abandoned.is_err());
        assert_eq!(good.received().len(), 1);

        assert_eq!(trigger.trigger(&msg).await, Ok(1));
        assert_eq!(trigger.dedup().lookup("m1").await.map(|e| e.recipient_count), Some(1));
        assert_eq!(good.received().len(), 1);
        assert!(!registry.contains(slow.id()));
    }
}
