//! Time source for the decision cycle.
//!
//! Each reading carries two views of the same moment. The UTC instant is what
//! elapsed time is measured on (PID integration, dwell timers), so civil-time
//! jumps such as a daylight-saving fall-back never look like time running
//! backwards. The local civil time only feeds the threshold policy, which
//! cares about calendar month and time of day. Tests swap in a
//! [`ManualClock`].

use std::ops::{Add, Sub};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// One reading of the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// Instant used for elapsed-time arithmetic
    pub instant: DateTime<Utc>,
    /// Wall-clock time used for season and day/night classification
    pub local: NaiveDateTime,
}

impl Timestamp {
    pub fn new(instant: DateTime<Utc>, local: NaiveDateTime) -> Self {
        Self { instant, local }
    }

    /// A timestamp whose local time coincides with UTC
    pub fn from_local(local: NaiveDateTime) -> Self {
        Self {
            instant: local.and_utc(),
            local,
        }
    }
}

impl Add<TimeDelta> for Timestamp {
    type Output = Timestamp;

    fn add(self, delta: TimeDelta) -> Timestamp {
        Timestamp {
            instant: self.instant + delta,
            local: self.local + delta,
        }
    }
}

impl Sub<TimeDelta> for Timestamp {
    type Output = Timestamp;

    fn sub(self, delta: TimeDelta) -> Timestamp {
        Timestamp {
            instant: self.instant - delta,
            local: self.local - delta,
        }
    }
}

/// A source of the current time
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// Reads the host clock, UTC for elapsed time and the host zone for civil time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let instant = Utc::now();
        Timestamp {
            instant,
            local: instant.with_timezone(&Local).naive_local(),
        }
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Start at `local`, with UTC and civil time coinciding
    pub fn new(local: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(Timestamp::from_local(local))),
        }
    }

    /// Jump to an absolute reading (may move backwards)
    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now = *now + delta;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(TimeDelta::seconds(secs));
    }

    /// Move civil time only, as a zone offset change does
    pub fn shift_local(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        now.local += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// Seconds between two instants as a float, negative when `later` is earlier
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let delta = later - earlier;
    delta.num_milliseconds() as f64 / 1000.0
}
