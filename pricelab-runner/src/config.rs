//! Serializable simulation configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! assets = 5
//! iterations = 100
//! initial_price = 100.0
//! trend_reversal_percentage = 10.0
//! seed = 42
//!
//! [thresholds]
//! upward_threshold = 5.0
//! downward_threshold = 50.0
//! stop_loss_threshold = 3.0
//!
//! [walk]
//! max_step = 10.0
//! floor = 0.01
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pricelab_core::{TickConfig, WalkConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Everything needed to reproduce one simulated portfolio run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub assets: usize,
    pub iterations: usize,
    pub initial_price: f64,
    pub trend_reversal_percentage: f64,
    pub seed: u64,
    pub thresholds: TickConfig,
    pub walk: WalkConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            assets: 5,
            iterations: 100,
            initial_price: 100.0,
            trend_reversal_percentage: 10.0,
            seed: 42,
            thresholds: TickConfig::default(),
            walk: WalkConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assets == 0 {
            return Err(ConfigError::invalid("assets", "must be at least 1"));
        }
        if !self.initial_price.is_finite() || self.initial_price <= 0.0 {
            return Err(ConfigError::invalid(
                "initial_price",
                format!("must be finite and positive, got {}", self.initial_price),
            ));
        }
        if !self.trend_reversal_percentage.is_finite() || self.trend_reversal_percentage < 0.0 {
            return Err(ConfigError::invalid(
                "trend_reversal_percentage",
                format!(
                    "must be a finite percentage >= 0, got {}",
                    self.trend_reversal_percentage
                ),
            ));
        }
        self.thresholds
            .validate()
            .map_err(|e| ConfigError::invalid("thresholds", e.to_string()))?;
        validate_walk(&self.walk)
    }
}

pub(crate) fn validate_walk(walk: &WalkConfig) -> Result<(), ConfigError> {
    if !walk.max_step.is_finite() || walk.max_step < 0.0 {
        return Err(ConfigError::invalid(
            "walk.max_step",
            format!("must be finite and >= 0, got {}", walk.max_step),
        ));
    }
    if !walk.floor.is_finite() || walk.floor <= 0.0 {
        return Err(ConfigError::invalid(
            "walk.floor",
            format!("must be finite and positive, got {}", walk.floor),
        ));
    }
    Ok(())
}
