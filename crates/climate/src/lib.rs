//! Climate Controller
//!
//! Wires the decision core to its surroundings: an in-process message bus for
//! sensor readings and relay commands, the ingress worker, and the operator
//! HTTP API.

pub mod bus;
pub mod config;
pub mod publisher;
pub mod server;
pub mod service;
pub mod telemetry;

pub use bus::{Message, MessageBus, CONTROLLER_SOURCE};
pub use config::{ClimateConfig, ConfigError, LogFormat};
pub use publisher::BusCommandPublisher;
pub use service::{ControllerHandle, ControllerService, ServiceError, WorkerState};
