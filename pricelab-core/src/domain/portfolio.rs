use serde::{Deserialize, Serialize};

use super::asset::Asset;
use crate::engine::TickConfig;

/// A set of assets driven with one threshold configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub assets: Vec<Asset>,
    pub thresholds: TickConfig,
}

impl Portfolio {
    pub fn new(thresholds: TickConfig) -> Self {
        Self {
            assets: Vec::new(),
            thresholds,
        }
    }

    /// Opening value still held in active positions.
    pub fn active_positions_value(&self) -> f64 {
        self.assets.iter().map(Asset::active_positions_value).sum()
    }

    /// Opening value of positions that have been closed.
    pub fn closed_positions_value(&self) -> f64 {
        self.assets.iter().map(Asset::closed_positions_value).sum()
    }

    /// Closed value minus active value.
    pub fn total_value(&self) -> f64 {
        self.closed_positions_value() - self.active_positions_value()
    }

    pub fn position_count(&self) -> usize {
        self.assets.iter().map(|a| a.positions.len()).sum()
    }
}
