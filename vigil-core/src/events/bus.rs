//! Event bus for session observation
//!
//! Pub/sub messaging over a Tokio broadcast channel. The control loop
//! publishes; the intervention dispatcher, event history, and the
//! surrounding application subscribe.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::MonitorEvent;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to MonitorEventBus
pub type SharedEventBus = Arc<MonitorEventBus>;

/// Broadcast-based event bus for a single monitoring session.
pub struct MonitorEventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorEventBus {
    /// Create a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus.
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers.
    ///
    /// Having no subscribers is not an error: the control loop must not
    /// depend on anyone listening.
    pub fn publish(&self, event: MonitorEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "Event published"),
            Err(_) => debug!(event_type, "Event published (no receivers)"),
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MonitorEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = MonitorEventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(MonitorEvent::SessionStarted {
            rule_preview: "no social media".to_string(),
            timestamp: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "session_started");
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = MonitorEventBus::new().shared();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(MonitorEvent::StandDownIssued {
            timestamp: Utc::now(),
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.event_type(), e2.event_type());
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = MonitorEventBus::new();
        bus.publish(MonitorEvent::SessionEnded {
            timestamp: Utc::now(),
        });
    }
}
