//! Tick orchestration: validates one tick's inputs and runs the engines in order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{apply_stop_loss, evaluate_thresholds};
use crate::domain::Asset;
use crate::events::{ActionEvent, ActionKind, ActionSink};

/// Threshold percentages applied on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub upward_threshold: f64,
    pub downward_threshold: f64,
    pub stop_loss_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            upward_threshold: 5.0,
            downward_threshold: 50.0,
            stop_loss_threshold: 3.0,
        }
    }
}

impl TickConfig {
    pub fn validate(&self) -> Result<(), TickError> {
        for (name, value) in [
            ("upward_threshold", self.upward_threshold),
            ("downward_threshold", self.downward_threshold),
            ("stop_loss_threshold", self.stop_loss_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TickError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TickError {
    #[error("{name} must be a finite percentage >= 0, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("asset {asset}: {field} must be finite and positive, got {value}")]
    InvalidPrice {
        asset: String,
        field: &'static str,
        value: f64,
    },
}

/// What happened to an asset during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutcome {
    pub opened: usize,
    pub stops_adjusted: usize,
    pub closed: usize,
    pub reversal_latched: bool,
    pub reversal_reset: bool,
}

impl TickOutcome {
    pub fn is_quiet(&self) -> bool {
        *self == Self::default()
    }
}

/// Counts transitions on their way to the caller's sink.
struct Tally<'a> {
    inner: &'a mut dyn ActionSink,
    outcome: TickOutcome,
}

impl ActionSink for Tally<'_> {
    fn record(&mut self, event: ActionEvent) {
        match event.kind {
            ActionKind::PositionOpened { .. } => self.outcome.opened += 1,
            ActionKind::StopAdjusted { .. } => self.outcome.stops_adjusted += 1,
            ActionKind::PositionClosed { .. } => self.outcome.closed += 1,
            ActionKind::ReversalLatched { .. } => self.outcome.reversal_latched = true,
            ActionKind::ReversalReset { .. } => self.outcome.reversal_reset = true,
            ActionKind::AnchorMoved { .. } => {}
        }
        self.inner.record(event);
    }
}

/// Run the threshold engine then the stop-loss engine for the asset's current tick.
///
/// The caller is expected to have already moved the asset to the new price with
/// [`Asset::advance`]. Inputs are validated before any state is touched; on error
/// the asset is unchanged.
pub fn process_tick(
    asset: &mut Asset,
    config: &TickConfig,
    sink: &mut dyn ActionSink,
) -> Result<TickOutcome, TickError> {
    config.validate()?;
    validate_prices(asset)?;

    let change_percentage = asset.change_percentage();
    let positions_before = asset.positions.len();

    let mut tally = Tally {
        inner: sink,
        outcome: TickOutcome::default(),
    };
    evaluate_thresholds(
        asset,
        config.upward_threshold,
        config.downward_threshold,
        &mut tally,
    );
    apply_stop_loss(asset, change_percentage, config.stop_loss_threshold, &mut tally);

    debug_assert!(asset.positions.len() >= positions_before);
    debug_assert_eq!(asset.positions.len() - positions_before, tally.outcome.opened);
    debug_assert!(asset.trend_reversed || asset.reverse_trend_trigger_value.is_none());

    Ok(tally.outcome)
}

fn validate_prices(asset: &Asset) -> Result<(), TickError> {
    let mut checks = vec![
        ("price", asset.price),
        ("previous_price", asset.previous_price),
    ];
    if !asset.positions.is_empty() {
        checks.push(("highest_opening_price", asset.highest_opening_price));
    }

    for (field, value) in checks {
        if !value.is_finite() || value <= 0.0 {
            return Err(TickError::InvalidPrice {
                asset: asset.name.clone(),
                field,
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Position;
    use crate::events::NullSink;

    #[test]
    fn default_thresholds() {
        let config = TickConfig::default();
        assert_eq!(config.upward_threshold, 5.0);
        assert_eq!(config.downward_threshold, 50.0);
        assert_eq!(config.stop_loss_threshold, 3.0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: TickConfig = serde_json::from_str(r#"{"upward_threshold": 8.0}"#).unwrap();
        assert_eq!(config.upward_threshold, 8.0);
        assert_eq!(config.stop_loss_threshold, 3.0);
    }

    #[test]
    fn bootstrap_tick_reports_one_open() {
        let mut asset = Asset::new("Test", 100.0, 10.0);
        let outcome = process_tick(&mut asset, &TickConfig::default(), &mut NullSink).unwrap();
        assert_eq!(outcome.opened, 1);
        assert!(!outcome.reversal_latched);
    }

    #[test]
    fn rejects_negative_threshold() {
        let mut asset = Asset::new("Test", 100.0, 10.0);
        let config = TickConfig {
            stop_loss_threshold: -1.0,
            ..TickConfig::default()
        };
        let err = process_tick(&mut asset, &config, &mut NullSink).unwrap_err();
        assert_eq!(
            err,
            TickError::InvalidThreshold {
                name: "stop_loss_threshold",
                value: -1.0,
            }
        );
        assert!(asset.positions.is_empty());
    }

    #[test]
    fn rejects_zero_previous_price() {
        let mut asset = Asset::new("Test", 100.0, 10.0);
        asset.previous_price = 0.0;
        let err = process_tick(&mut asset, &TickConfig::default(), &mut NullSink).unwrap_err();
        assert!(matches!(
            err,
            TickError::InvalidPrice {
                field: "previous_price",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_ceiling_only_with_positions() {
        let mut asset = Asset::new("Test", 100.0, 10.0);
        asset.highest_opening_price = f64::NAN;
        assert!(process_tick(&mut asset, &TickConfig::default(), &mut NullSink).is_ok());

        asset.highest_opening_price = 0.0;
        asset.advance(101.0);
        assert!(process_tick(&mut asset, &TickConfig::default(), &mut NullSink).is_err());
    }

    #[test]
    fn outcome_counts_stop_adjustments() {
        let mut asset = Asset::new("Test", 100.0, 10.0);
        asset.positions.push(Position::open(100.0));
        asset.advance(104.0);
        let outcome = process_tick(&mut asset, &TickConfig::default(), &mut NullSink).unwrap();
        assert_eq!(outcome.stops_adjusted, 1);
        assert_eq!(outcome.opened, 0);
        assert!(!outcome.is_quiet());
    }
}
