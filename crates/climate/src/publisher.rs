//! Command Publisher
//!
//! Serializes each decision into the relay command JSON and publishes it on
//! the command topic. Operator set-points are mirrored on the set-point topic.

use climate_engine::{CommandPublisher, Decision, TopicConfig};

use crate::bus::{MessageBus, CONTROLLER_SOURCE};

/// Publishes relay commands onto the [`MessageBus`]
#[derive(Debug, Clone)]
pub struct BusCommandPublisher {
    bus: MessageBus,
    command_topic: String,
    set_point_topic: String,
}

impl BusCommandPublisher {
    pub fn new(bus: MessageBus, topics: &TopicConfig) -> Self {
        Self {
            bus,
            command_topic: topics.command.clone(),
            set_point_topic: topics.set_point.clone(),
        }
    }
}

impl CommandPublisher for BusCommandPublisher {
    fn publish(&self, decision: &Decision) {
        let command = decision.actuation.command();
        let payload = match command.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize control command");
                return;
            }
        };

        self.bus
            .emit(&self.command_topic, CONTROLLER_SOURCE, payload.as_bytes());
        tracing::info!(
            topic = %self.command_topic,
            mode = %decision.mode,
            control_signal = decision.control_signal,
            "Published control command: {}",
            payload
        );
    }

    fn mirror_set_point(&self, set_point: f64) {
        self.bus
            .emit(&self.set_point_topic, CONTROLLER_SOURCE, set_point.to_string());
        tracing::debug!(topic = %self.set_point_topic, set_point, "Mirrored set-point");
    }
}
