//! HTTP Protocol Messages
//!
//! Request and response bodies of the operator surface.

use serde::{Deserialize, Serialize};

use climate_engine::{ClimateSnapshot, HvacMode, on_off};

/// Reply text for an accepted set-point
pub const SET_POINT_ACCEPTED: &str = "Temperature set successfully";

/// Reply text for a set-point that is not a finite number
pub const SET_POINT_REJECTED: &str = "Invalid temperature value";

/// Status page: readings, set-point and relay states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub current_temperature: Option<f64>,
    pub set_temperature: Option<f64>,
    pub outdoor_temperature: Option<f64>,
    pub outdoor_average: Option<f64>,
    pub fan_state: String,
    pub cooling_state: String,
    pub heating_state: String,
    pub mode: HvacMode,
}

impl From<ClimateSnapshot> for StatusResponse {
    fn from(snapshot: ClimateSnapshot) -> Self {
        Self {
            current_temperature: snapshot.indoor,
            set_temperature: snapshot.set_point,
            outdoor_temperature: snapshot.outdoor,
            outdoor_average: snapshot.outdoor_average,
            fan_state: snapshot.fan_label().to_string(),
            cooling_state: snapshot.cooling_label().to_string(),
            heating_state: snapshot.heating_label().to_string(),
            mode: snapshot.mode,
        }
    }
}

/// Actuator states as "ON"/"OFF"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuationResponse {
    pub fan: String,
    pub cooling: String,
    pub heating: String,
}

impl ActuationResponse {
    pub fn new(fan: bool, cooling: bool, heating: bool) -> Self {
        Self {
            fan: on_off(fan).to_string(),
            cooling: on_off(cooling).to_string(),
            heating: on_off(heating).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub control_signal: f64,
}

/// Form body of `POST /set_temperature`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetTemperatureForm {
    #[serde(default)]
    pub set_temperature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetTemperatureResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_temperature: Option<f64>,
}

impl SetTemperatureResponse {
    pub fn accepted(value: f64) -> Self {
        Self {
            message: SET_POINT_ACCEPTED.to_string(),
            set_temperature: Some(value),
        }
    }

    pub fn rejected() -> Self {
        Self {
            message: SET_POINT_REJECTED.to_string(),
            set_temperature: None,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cycles: u64,
}
