//! Coordinator-facing event broadcaster (§4.8, §4.8.1).
//!
//! Every notable state change in the system funnels through `publish`,
//! which stamps a monotonic sequence number and fans the envelope out to
//! every live `subscribe()` caller over a `tokio::sync::broadcast` channel.
//! Subscribers that fall behind the channel's capacity silently miss the
//! oldest events rather than blocking publishers; `Subscription::dropped`
//! on the receive side is reported to callers who want to know.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{EventEnvelope, SystemEvent};

const CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts `SystemEvent`s to any number of subscribers.
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    sequence: AtomicU64,
}

impl EventBus {
    /// Creates a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publishes an event, assigning it the next sequence number.
    ///
    /// Returns the number of subscribers the event was delivered to. A
    /// return of `0` is not an error: it means nobody is currently
    /// subscribed.
    pub fn publish(&self, event: SystemEvent) -> usize {
        let envelope = EventEnvelope {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            id: Uuid::new_v4(),
            occurred_at: chrono::Utc::now(),
            event,
        };
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribes to the event stream, returning a handle whose `Drop`
    /// unregisters the subscription.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of currently live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A cancellable subscription to the coordinator's event stream.
///
/// Unsubscription is implicit: dropping the handle drops the underlying
/// broadcast receiver.
pub struct Subscription {
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl Subscription {
    /// Awaits the next event, reporting the number of events missed if
    /// this subscriber fell behind the channel's capacity.
    pub async fn recv(&mut self) -> Result<EventEnvelope, RecvError> {
        match self.receiver.recv().await {
            Ok(envelope) => Ok(envelope),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(RecvError::Lagged(skipped)),
            Err(broadcast::error::RecvError::Closed) => Err(RecvError::Closed),
        }
    }
}

/// Failure modes for `Subscription::recv`.
#[derive(Debug, thiserror::Error)]
pub enum RecvError {
    /// The subscriber fell behind and this many events were dropped.
    #[error("subscriber lagged, {0} events dropped")]
    Lagged(u64),
    /// The bus itself was dropped.
    #[error("event bus closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SwarmId;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = Arc::new(EventBus::new());
        let mut sub = bus.subscribe();

        bus.publish(SystemEvent::SwarmSpawned {
            swarm_id: SwarmId::new(),
            objective: "test".into(),
        });

        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.sequence, 0);
        assert!(matches!(envelope.event, SystemEvent::SwarmSpawned { .. }));
    }

    #[tokio::test]
    async fn sequence_numbers_are_monotonic() {
        let bus = Arc::new(EventBus::new());
        let mut sub = bus.subscribe();

        for _ in 0..3 {
            bus.publish(SystemEvent::SwarmSpawned {
                swarm_id: SwarmId::new(),
                objective: "test".into(),
            });
        }

        for expected in 0..3 {
            assert_eq!(sub.recv().await.unwrap().sequence, expected);
        }
    }

    #[test]
    fn publish_with_no_subscribers_reports_zero_delivered() {
        let bus = EventBus::new();
        let delivered = bus.publish(SystemEvent::SwarmSpawned {
            swarm_id: SwarmId::new(),
            objective: "test".into(),
        });
        assert_eq!(delivered, 0);
    }
}
