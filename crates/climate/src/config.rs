//! Configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `CLIMATE_`-prefixed environment variables (`__` separates sections, e.g.
//! `CLIMATE_SERVER__PORT=8080`). Command-line overrides are applied by the
//! binary on top of the extracted value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use climate_engine::{EngineConfig, ThresholdConfig, TopicConfig};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "climate.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CLIMATE_";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Decision engine tuning plus controller runtime knobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    /// Set-point to start with instead of waiting for the operator
    pub initial_set_point: Option<f64>,
    /// Periodic re-evaluation, off when unset
    pub reevaluate_interval_secs: Option<u64>,
}

impl ControllerConfig {
    pub fn reevaluate_interval(&self) -> Option<Duration> {
        self.reevaluate_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// Climate Config
// ─────────────────────────────────────────────────────────────────────────────

/// Full controller configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub server: ServerConfig,
    pub topics: TopicConfig,
    pub controller: ControllerConfig,
    pub thresholds: ThresholdConfig,
    pub log: LogConfig,
}

impl ClimateConfig {
    /// Load from defaults, the given (or default) TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: ClimateConfig = Self::figment(&file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Provider chain; a missing file contributes nothing
    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(ClimateConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Engine configuration with the threshold section folded in
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            thresholds: self.thresholds,
            ..self.controller.engine.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.controller.engine;
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(engine.high_threshold > 0.0 && engine.moderate_threshold > 0.0) {
            return invalid("controller thresholds must be positive".to_string());
        }
        if engine.moderate_threshold > engine.high_threshold {
            return invalid(format!(
                "moderate_threshold ({}) exceeds high_threshold ({})",
                engine.moderate_threshold, engine.high_threshold
            ));
        }
        if !(engine.gains.windup_guard > 0.0) {
            return invalid("windup_guard must be positive".to_string());
        }
        if engine.min_dwell_secs < 0 {
            return invalid("min_dwell_secs must not be negative".to_string());
        }
        if !(self.thresholds.comfort_offset > 0.0 && self.thresholds.trigger_offset > 0.0) {
            return invalid("threshold offsets must be positive".to_string());
        }
        if !(0.0..=100.0).contains(&self.thresholds.seasonal_allowance_pct) {
            return invalid(format!(
                "seasonal_allowance_pct ({}) must be within 0..=100",
                self.thresholds.seasonal_allowance_pct
            ));
        }
        if self
            .controller
            .initial_set_point
            .is_some_and(|set_point| !set_point.is_finite())
        {
            return invalid("initial_set_point must be finite".to_string());
        }
        Ok(())
    }
}
