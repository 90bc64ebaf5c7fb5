//! Server Application State
//!
//! Shared state accessible by all HTTP handlers.

use std::sync::Arc;

use climate_engine::{parse_set_point, ClimateResult, ClimateSnapshot, Decision, SharedClimate};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Climate state shared with the ingress worker
    climate: SharedClimate,
}

impl AppState {
    pub fn new(climate: SharedClimate) -> Self {
        Self {
            inner: Arc::new(AppStateInner { climate }),
        }
    }

    pub fn climate(&self) -> &SharedClimate {
        &self.inner.climate
    }

    pub fn snapshot(&self) -> ClimateSnapshot {
        self.inner.climate.snapshot()
    }

    /// Parse and apply an operator set-point.
    ///
    /// On success the decision cycle runs and the publisher mirrors the value
    /// onto the set-point topic. On failure nothing changes.
    pub fn set_set_point(&self, text: &str) -> ClimateResult<(f64, Option<Decision>)> {
        let value = parse_set_point(text)?;
        let decision = self.inner.climate.set_set_point(value);
        tracing::info!(set_point = value, "Set-point updated by operator");

        Ok((value, decision))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("climate", &self.inner.climate)
            .finish()
    }
}
