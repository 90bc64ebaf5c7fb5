//! Dwell Tracker
//!
//! Remembers when each actuator was switched on so the engine can refuse to
//! switch it off again before the minimum run time has elapsed. This is what
//! keeps the compressor and furnace from short-cycling.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Default minimum run time once an actuator turns on
pub const DEFAULT_MIN_DWELL_SECS: i64 = 300;

/// The three switched outputs of the HVAC unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Fan,
    Cooling,
    Heating,
}

impl Actuator {
    pub const ALL: [Actuator; 3] = [Actuator::Fan, Actuator::Cooling, Actuator::Heating];

    /// The actuator that may never run at the same time as this one
    pub fn exclusive_with(self) -> Option<Actuator> {
        match self {
            Actuator::Cooling => Some(Actuator::Heating),
            Actuator::Heating => Some(Actuator::Cooling),
            Actuator::Fan => None,
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actuator::Fan => write!(f, "fan"),
            Actuator::Cooling => write!(f, "cooling"),
            Actuator::Heating => write!(f, "heating"),
        }
    }
}

/// Activation record for one actuator.
///
/// The timestamp is present exactly when the actuator is active, so a record
/// that was never activated can not produce a hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DwellRecord {
    activated_at: Option<DateTime<Utc>>,
}

impl DwellRecord {
    pub fn is_active(&self) -> bool {
        self.activated_at.is_some()
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }
}

/// Tracks activation time for fan, cooling and heating
#[derive(Debug, Clone)]
pub struct DwellTracker {
    min_dwell: TimeDelta,
    fan: DwellRecord,
    cooling: DwellRecord,
    heating: DwellRecord,
}

impl Default for DwellTracker {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_MIN_DWELL_SECS))
    }
}

impl DwellTracker {
    pub fn new(min_dwell: TimeDelta) -> Self {
        Self {
            min_dwell,
            fan: DwellRecord::default(),
            cooling: DwellRecord::default(),
            heating: DwellRecord::default(),
        }
    }

    pub fn min_dwell(&self) -> TimeDelta {
        self.min_dwell
    }

    pub fn record(&self, actuator: Actuator) -> DwellRecord {
        match actuator {
            Actuator::Fan => self.fan,
            Actuator::Cooling => self.cooling,
            Actuator::Heating => self.heating,
        }
    }

    fn record_mut(&mut self, actuator: Actuator) -> &mut DwellRecord {
        match actuator {
            Actuator::Fan => &mut self.fan,
            Actuator::Cooling => &mut self.cooling,
            Actuator::Heating => &mut self.heating,
        }
    }

    pub fn is_active(&self, actuator: Actuator) -> bool {
        self.record(actuator).is_active()
    }

    /// Time left before an active actuator may be switched off.
    ///
    /// `None` when the actuator is inactive, has completed its dwell, or was
    /// activated after `now` (a clock that went backwards never holds).
    pub fn remaining(&self, actuator: Actuator, now: DateTime<Utc>) -> Option<TimeDelta> {
        let since = self.record(actuator).activated_at?;
        let elapsed = now - since;
        if elapsed < TimeDelta::zero() {
            tracing::warn!(%actuator, "Activation time is in the future, not holding");
            return None;
        }
        let left = self.min_dwell - elapsed;
        (left > TimeDelta::zero()).then_some(left)
    }

    /// True while an active actuator has not yet completed its minimum dwell
    pub fn should_hold(&self, actuator: Actuator, now: DateTime<Utc>) -> bool {
        self.remaining(actuator, now).is_some()
    }

    /// Mark an actuator active. The timer only starts on an off→on
    /// transition; the exclusive partner is dropped immediately regardless of
    /// its own dwell. Returns whether the actuator was newly activated.
    pub fn activate(&mut self, actuator: Actuator, now: DateTime<Utc>) -> bool {
        if let Some(partner) = actuator.exclusive_with() {
            if self.deactivate(partner) {
                tracing::debug!(%actuator, %partner, "Exclusive actuator switched off");
            }
        }

        let record = self.record_mut(actuator);
        if record.is_active() {
            return false;
        }
        record.activated_at = Some(now);
        true
    }

    /// Clear the record. Returns whether the actuator was active.
    pub fn deactivate(&mut self, actuator: Actuator) -> bool {
        self.record_mut(actuator).activated_at.take().is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
