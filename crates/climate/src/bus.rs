//! Message Bus
//!
//! In-process publish/subscribe channel standing in for the broker. Sensor
//! feeds, set-point changes and relay commands all travel as [`Message`]s.

use tokio::sync::broadcast;

/// Source tag the controller stamps on everything it publishes
pub const CONTROLLER_SOURCE: &str = "climate";

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// A payload published on a topic
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Topic name (e.g., "temperature", "ac_control")
    pub topic: String,

    /// Publisher that produced the message
    pub source: String,

    /// Raw payload bytes
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        source: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            source: source.into(),
            payload: payload.into(),
        }
    }

    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Whether the controller itself published this message
    pub fn is_own(&self) -> bool {
        self.source == CONTROLLER_SOURCE
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message Bus
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable handle to the broadcast channel
#[derive(Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Message>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }

    /// Publish a message. Returns the number of subscribers reached; having
    /// none is not an error.
    pub fn publish(&self, message: Message) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    /// Create and publish a message
    pub fn emit(
        &self,
        topic: impl Into<String>,
        source: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> usize {
        self.publish(Message::new(topic, source, payload))
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_messages() {
        assert!(Message::new("set_temperature", CONTROLLER_SOURCE, "70").is_own());
        assert!(!Message::new("set_temperature", "dashboard", "70").is_own());
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = MessageBus::new(16);
        assert_eq!(bus.emit("temperature", "test", "70"), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.emit("temperature", "test", "71.5"), 1);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic, "temperature");
        assert_eq!(message.payload_str(), Some("71.5"));
    }
}
