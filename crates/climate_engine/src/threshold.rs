//! Threshold Policy
//!
//! Shapes the comfort band and the outdoor trigger levels around the
//! set-point. The result depends only on its inputs, so the season and
//! day/night behaviour can be tested without touching the wall clock.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Calendar season derived from the month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Summer,
    Winter,
    Shoulder,
}

impl Season {
    /// June through August is summer, December through February is winter
    pub fn from_month(month: u32) -> Self {
        match month {
            6..=8 => Season::Summer,
            12 | 1 | 2 => Season::Winter,
            _ => Season::Shoulder,
        }
    }
}

/// Day or night, night being [22:00, 06:00)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    pub fn from_time(time: NaiveTime) -> Self {
        let hour = time.hour();
        if hour >= 22 || hour < 6 {
            DayPhase::Night
        } else {
            DayPhase::Day
        }
    }
}

/// Offsets and seasonal shaping parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Half-width of the comfort band around the set-point
    pub comfort_offset: f64,
    /// Distance of the heating/cooling triggers from the set-point
    pub trigger_offset: f64,
    /// Share (percent) of the outdoor average's distance from the set-point
    /// that tightens the comfort band on summer nights and winter days
    pub seasonal_allowance_pct: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            comfort_offset: 1.0,
            trigger_offset: 2.0,
            seasonal_allowance_pct: 15.0,
        }
    }
}

/// Thresholds for one decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    /// Cooling is only allowed when the outdoor reading is above this
    pub cooling_trigger: f64,
    /// Heating is only allowed when the outdoor reading is below this
    pub heating_trigger: f64,
    pub comfort_low: f64,
    pub comfort_high: f64,
    pub season: Season,
    pub phase: DayPhase,
}

impl ThresholdBand {
    /// Whether an indoor temperature sits inside the comfort band
    pub fn is_comfortable(&self, indoor: f64) -> bool {
        indoor >= self.comfort_low && indoor <= self.comfort_high
    }
}

/// Computes a [`ThresholdBand`] from set-point, outdoor statistics and time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThresholdPolicy {
    config: ThresholdConfig,
}

impl ThresholdPolicy {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn band(
        &self,
        set_point: f64,
        outdoor_average: Option<f64>,
        at: NaiveDateTime,
    ) -> ThresholdBand {
        let season = Season::from_month(at.month());
        let phase = DayPhase::from_time(at.time());
        let cfg = &self.config;

        let mut band = ThresholdBand {
            cooling_trigger: set_point + cfg.trigger_offset,
            heating_trigger: set_point - cfg.trigger_offset,
            comfort_low: set_point - cfg.comfort_offset,
            comfort_high: set_point + cfg.comfort_offset,
            season,
            phase,
        };

        let Some(average) = outdoor_average else {
            return band;
        };
        let share = cfg.seasonal_allowance_pct / 100.0;

        match (season, phase) {
            (Season::Summer, DayPhase::Night) => {
                let allowance = share * (average - set_point).max(0.0);
                band.comfort_high = (band.comfort_high - allowance).max(set_point);
            }
            (Season::Winter, DayPhase::Day) => {
                let allowance = share * (set_point - average).max(0.0);
                band.comfort_low = (band.comfort_low + allowance).min(set_point);
            }
            _ => {}
        }

        band
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
