//! Shared Climate State
//!
//! Everything the decision cycle reads or writes lives in one [`ClimateState`]
//! behind a single mutex. [`SharedClimate`] is the cloneable handle that the
//! ingress worker and the operator surface both hold; every call applies its
//! input, recomputes and publishes while holding the lock, so a command is
//! never derived from a half-applied update.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::{Clock, Timestamp};
use crate::command::{on_off, ActuationState, HvacMode};
use crate::engine::{Decision, DecisionEngine, EngineConfig, Readings};
use crate::error::{ClimateError, ClimateResult};
use crate::ingress::ClimateInput;

/// Receives every decision, while the state lock is held.
///
/// Implementations must not block.
pub trait CommandPublisher: Send + Sync + 'static {
    fn publish(&self, decision: &Decision);

    /// An operator replaced the set-point. Called under the same lock as the
    /// update, so mirrors go out in the order the values were applied.
    fn mirror_set_point(&self, _set_point: f64) {}
}

/// Mutable controller state
#[derive(Debug)]
pub struct ClimateState {
    set_point: Option<f64>,
    readings: Readings,
    engine: DecisionEngine,
    last_decision: Option<Decision>,
    cycles: u64,
}

impl ClimateState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            set_point: None,
            readings: Readings::default(),
            engine: DecisionEngine::new(config),
            last_decision: None,
            cycles: 0,
        }
    }

    pub fn set_point(&self) -> Option<f64> {
        self.set_point
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    /// Store a validated input; does not recompute
    pub fn apply(&mut self, input: ClimateInput) {
        match input {
            ClimateInput::Indoor(v) => self.readings.indoor = Some(v),
            ClimateInput::Outdoor(v) => self.readings.outdoor = Some(v),
            ClimateInput::OutdoorAverage(v) => self.readings.outdoor_average = Some(v),
            ClimateInput::SetPoint(v) => self.set_point = Some(v),
        }
    }

    /// Run a decision cycle. No actuator is touched until a set-point and an
    /// indoor reading are both known.
    pub fn recompute(&mut self, now: Timestamp) -> ClimateResult<Decision> {
        let set_point = self.set_point.ok_or(ClimateError::MissingSetPoint)?;
        let decision = self.engine.decide(set_point, &self.readings, now)?;
        self.last_decision = Some(decision);
        self.cycles += 1;
        Ok(decision)
    }

    pub fn snapshot(&self) -> ClimateSnapshot {
        let actuation = self.engine.actuation();
        ClimateSnapshot {
            set_point: self.set_point,
            indoor: self.readings.indoor,
            outdoor: self.readings.outdoor,
            outdoor_average: self.readings.outdoor_average,
            mode: self.engine.mode(),
            fan: actuation.fan(),
            cooling: actuation.cooling(),
            heating: actuation.heating(),
            control_signal: self.engine.control_signal(),
            cycles: self.cycles,
        }
    }
}

/// Point-in-time copy of the state for the operator surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateSnapshot {
    pub set_point: Option<f64>,
    pub indoor: Option<f64>,
    pub outdoor: Option<f64>,
    pub outdoor_average: Option<f64>,
    pub mode: HvacMode,
    pub fan: bool,
    pub cooling: bool,
    pub heating: bool,
    pub control_signal: f64,
    pub cycles: u64,
}

impl ClimateSnapshot {
    pub fn fan_label(&self) -> &'static str {
        on_off(self.fan)
    }

    pub fn cooling_label(&self) -> &'static str {
        on_off(self.cooling)
    }

    pub fn heating_label(&self) -> &'static str {
        on_off(self.heating)
    }
}

/// Cloneable handle to the locked [`ClimateState`]
#[derive(Clone)]
pub struct SharedClimate {
    inner: Arc<SharedClimateInner>,
}

struct SharedClimateInner {
    state: Mutex<ClimateState>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn CommandPublisher>,
}

impl SharedClimate {
    pub fn new(
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn CommandPublisher>,
    ) -> Self {
        Self {
            inner: Arc::new(SharedClimateInner {
                state: Mutex::new(ClimateState::new(config)),
                clock,
                publisher,
            }),
        }
    }

    /// Apply an input, recompute and publish as one critical section.
    ///
    /// Returns `None` when the cycle was suppressed for lack of a set-point
    /// or indoor reading.
    pub fn submit(&self, input: ClimateInput) -> Option<Decision> {
        let mut state = self.inner.state.lock();
        state.apply(input);
        tracing::debug!(%input, "Input accepted");
        self.cycle(&mut state)
    }

    /// Replace the set-point from the operator path and mirror it through
    /// the publisher
    pub fn set_set_point(&self, value: f64) -> Option<Decision> {
        let mut state = self.inner.state.lock();
        state.apply(ClimateInput::SetPoint(value));
        let decision = self.cycle(&mut state);
        self.inner.publisher.mirror_set_point(value);
        decision
    }

    /// Re-run the decision cycle without new input
    pub fn reevaluate(&self) -> Option<Decision> {
        let mut state = self.inner.state.lock();
        self.cycle(&mut state)
    }

    fn cycle(&self, state: &mut ClimateState) -> Option<Decision> {
        let now = self.inner.clock.now();
        match state.recompute(now) {
            Ok(decision) => {
                self.inner.publisher.publish(&decision);
                Some(decision)
            }
            Err(e) => {
                tracing::debug!(reason = %e, "Decision cycle suppressed");
                None
            }
        }
    }

    pub fn snapshot(&self) -> ClimateSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn actuation(&self) -> ActuationState {
        self.inner.state.lock().engine().actuation()
    }

    pub fn control_signal(&self) -> f64 {
        self.inner.state.lock().engine().control_signal()
    }

    pub fn set_point(&self) -> Option<f64> {
        self.inner.state.lock().set_point()
    }
}

impl std::fmt::Debug for SharedClimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedClimate")
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
