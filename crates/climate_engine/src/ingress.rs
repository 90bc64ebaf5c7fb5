//! Ingress payload decoding.
//!
//! Sensor and set-point messages arrive as topic + raw payload. The indoor
//! sensor wraps its value as a JSON scalar; the outdoor, average and
//! set-point feeds send a bare number. Anything that does not decode to a
//! finite float is rejected here so it never reaches the shared state.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClimateError, ClimateResult};

/// A typed, validated input to the decision cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClimateInput {
    Indoor(f64),
    Outdoor(f64),
    OutdoorAverage(f64),
    SetPoint(f64),
}

impl ClimateInput {
    /// Short name of the feed, as used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClimateInput::Indoor(_) => "indoor",
            ClimateInput::Outdoor(_) => "outdoor",
            ClimateInput::OutdoorAverage(_) => "outdoor_average",
            ClimateInput::SetPoint(_) => "set_point",
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            ClimateInput::Indoor(v)
            | ClimateInput::Outdoor(v)
            | ClimateInput::OutdoorAverage(v)
            | ClimateInput::SetPoint(v) => v,
        }
    }
}

impl fmt::Display for ClimateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind(), self.value())
    }
}

/// Topic names for inputs and the command output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub indoor: String,
    pub outdoor: String,
    pub outdoor_average: String,
    pub set_point: String,
    pub command: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            indoor: "temperature".to_string(),
            outdoor: "external_temperature".to_string(),
            outdoor_average: "external_temperature_avg".to_string(),
            set_point: "set_temperature".to_string(),
            command: "ac_control".to_string(),
        }
    }
}

impl TopicConfig {
    /// Topics the controller consumes
    pub fn inputs(&self) -> [&str; 4] {
        [
            self.indoor.as_str(),
            self.outdoor.as_str(),
            self.outdoor_average.as_str(),
            self.set_point.as_str(),
        ]
    }

    pub fn is_input(&self, topic: &str) -> bool {
        self.inputs().contains(&topic)
    }

    /// Decode a payload received on `topic`
    pub fn decode(&self, topic: &str, payload: &[u8]) -> ClimateResult<ClimateInput> {
        if topic == self.indoor {
            parse_json_scalar(topic, payload).map(ClimateInput::Indoor)
        } else if topic == self.outdoor {
            parse_plain(topic, payload).map(ClimateInput::Outdoor)
        } else if topic == self.outdoor_average {
            parse_plain(topic, payload).map(ClimateInput::OutdoorAverage)
        } else if topic == self.set_point {
            parse_plain(topic, payload).map(ClimateInput::SetPoint)
        } else {
            Err(ClimateError::UnknownTopic(topic.to_string()))
        }
    }
}

/// Decode a JSON scalar (number or numeric string) into a finite float
pub fn parse_json_scalar(topic: &str, payload: &[u8]) -> ClimateResult<f64> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| invalid(topic, e))?;
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(topic, "number out of range"))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|e| invalid(topic, e))?,
        other => return Err(invalid(topic, format!("expected a number, got {}", other))),
    };
    finite(topic, number)
}

/// Decode a bare textual number into a finite float
pub fn parse_plain(topic: &str, payload: &[u8]) -> ClimateResult<f64> {
    let text = std::str::from_utf8(payload).map_err(|e| invalid(topic, e))?;
    let number = text.trim().parse::<f64>().map_err(|e| invalid(topic, e))?;
    finite(topic, number)
}

/// Parse operator input the same way as a bare set-point payload
pub fn parse_set_point(text: &str) -> ClimateResult<f64> {
    parse_plain("set_point", text.as_bytes())
}

fn finite(topic: &str, value: f64) -> ClimateResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ClimateError::NonFinite {
            topic: topic.to_string(),
        })
    }
}

fn invalid(topic: &str, reason: impl fmt::Display) -> ClimateError {
    ClimateError::InvalidPayload {
        topic: topic.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
