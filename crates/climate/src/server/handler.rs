//! HTTP Handlers

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::{Form, Json};

use super::protocol::*;
use super::state::AppState;

/// `GET /`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.snapshot().into())
}

/// `GET /state`
pub async fn actuation_state(State(state): State<AppState>) -> Json<ActuationResponse> {
    let actuation = state.climate().actuation();
    Json(ActuationResponse::new(
        actuation.fan(),
        actuation.cooling(),
        actuation.heating(),
    ))
}

/// `GET /control`
pub async fn control_signal(State(state): State<AppState>) -> Json<ControlResponse> {
    Json(ControlResponse {
        control_signal: state.climate().control_signal(),
    })
}

/// `POST /set_temperature`
///
/// A rejected value is a normal reply carrying an error message, not an
/// HTTP failure. That includes bodies that are not a form at all.
pub async fn set_temperature(
    State(state): State<AppState>,
    form: Result<Form<SetTemperatureForm>, FormRejection>,
) -> Json<SetTemperatureResponse> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected set-point request body");
            return Json(SetTemperatureResponse::rejected());
        }
    };

    match state.set_set_point(&form.set_temperature) {
        Ok((value, _)) => Json(SetTemperatureResponse::accepted(value)),
        Err(e) => {
            tracing::warn!(input = %form.set_temperature, error = %e, "Rejected set-point");
            Json(SetTemperatureResponse::rejected())
        }
    }
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cycles: state.snapshot().cycles,
    })
}
