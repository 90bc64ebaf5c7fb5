//! Error types for the decision core.

/// Errors raised while turning inputs into decisions.
///
/// None of these are fatal: ingress errors are logged and the payload is
/// dropped, missing prerequisites simply suppress the decision cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClimateError {
    #[error("Invalid payload on {topic}: {reason}")]
    InvalidPayload { topic: String, reason: String },

    #[error("Non-finite value on {topic}")]
    NonFinite { topic: String },

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("No set-point has been established")]
    MissingSetPoint,

    #[error("No indoor reading has been received")]
    MissingReading,
}

/// Result type for decision core operations
pub type ClimateResult<T> = Result<T, ClimateError>;
