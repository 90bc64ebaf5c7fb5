//! Climate Engine - Decision core for the climate controller
//!
//! This crate turns temperature readings and a set-point into fan, cooling and
//! heating actuation decisions. It performs no I/O and never awaits, so the
//! whole decision cycle can run inside a single critical section.
//!
//! ## Components
//!
//! - [`PidController`] - error to control-signal transducer with windup guard
//! - [`ThresholdPolicy`] - season and day/night shaped comfort band
//! - [`DwellTracker`] - minimum run time per actuator
//! - [`DecisionEngine`] - combines the three into an [`ActuationState`]
//! - [`SharedClimate`] - the locked aggregate that ingress and operator paths share

mod clock;
mod command;
mod dwell;
mod engine;
mod error;
mod ingress;
mod pid;
mod state;
mod threshold;

pub use clock::*;
pub use command::*;
pub use dwell::*;
pub use engine::*;
pub use error::*;
pub use ingress::*;
pub use pid::*;
pub use state::*;
pub use threshold::*;
