//! PID controller
//!
//! Converts the set-point error into a control signal. Positive output means
//! the room is colder than the target (heating demand), negative output means
//! it is warmer (cooling demand).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::seconds_between;

/// Default bound applied to the integral accumulator
pub const DEFAULT_WINDUP_GUARD: f64 = 20.0;

/// Controller gains and windup bound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// The accumulator is clamped to `[-windup_guard, windup_guard]`
    pub windup_guard: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.1,
            kd: 0.05,
            windup_guard: DEFAULT_WINDUP_GUARD,
        }
    }
}

/// Outcome of a single [`PidController::update`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PidUpdate {
    /// A new output was computed
    Computed(f64),
    /// The clock moved backwards; the previous output was kept
    ClockAnomaly { elapsed_secs: f64, output: f64 },
}

impl PidUpdate {
    pub fn output(&self) -> f64 {
        match *self {
            PidUpdate::Computed(output) => output,
            PidUpdate::ClockAnomaly { output, .. } => output,
        }
    }
}

/// PID controller with a clamped integral term
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    target: f64,
    integral: f64,
    last_error: f64,
    /// `None` until the first update; that update contributes no integral or
    /// derivative action.
    last_update: Option<DateTime<Utc>>,
    output: f64,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            target: 0.0,
            integral: 0.0,
            last_error: 0.0,
            last_update: None,
            output: 0.0,
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Replace the target used for error computation
    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Feed a measurement taken at `now` and return the new control signal.
    pub fn update(&mut self, measured: f64, now: DateTime<Utc>) -> PidUpdate {
        let error = self.target - measured;
        let elapsed = self
            .last_update
            .map(|last| seconds_between(last, now))
            .unwrap_or(0.0);

        if elapsed < 0.0 {
            tracing::warn!(
                elapsed_secs = elapsed,
                "Clock moved backwards, keeping previous control signal"
            );
            return PidUpdate::ClockAnomaly {
                elapsed_secs: elapsed,
                output: self.output,
            };
        }

        let p_term = self.gains.kp * error;

        let guard = self.gains.windup_guard;
        self.integral = (self.integral + error * elapsed).clamp(-guard, guard);

        let derivative = if elapsed > 0.0 {
            (error - self.last_error) / elapsed
        } else {
            0.0
        };

        self.output = p_term + self.gains.ki * self.integral + self.gains.kd * derivative;
        self.last_error = error;
        self.last_update = Some(now);

        PidUpdate::Computed(self.output)
    }

    /// Last computed control signal
    pub fn value(&self) -> f64 {
        self.output
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
