//! Parameter sweeps: many seeded runs across a list of parameter sets.
//!
//! Run `i` (1-based) uses parameter set `(i - 1) % sets.len()`. Runs are
//! independent, so they execute on the rayon pool; the report is always ordered
//! by run number and each run's prices depend only on `(seed, run, asset)`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use pricelab_core::{NullSink, TickConfig, WalkConfig};

use crate::config::{validate_walk, ConfigError, SimulationConfig};
use crate::simulation::{run_simulation, RunError, SimulationResult};

/// One point in the sweep: thresholds plus portfolio width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub upward_threshold: f64,
    pub downward_threshold: f64,
    pub stop_loss_threshold: f64,
    pub assets: usize,
}

impl ParameterSet {
    pub const fn new(up: f64, down: f64, stop_loss: f64, assets: usize) -> Self {
        Self {
            upward_threshold: up,
            downward_threshold: down,
            stop_loss_threshold: stop_loss,
            assets,
        }
    }

    pub fn thresholds(&self) -> TickConfig {
        TickConfig {
            upward_threshold: self.upward_threshold,
            downward_threshold: self.downward_threshold,
            stop_loss_threshold: self.stop_loss_threshold,
        }
    }

    /// The eight sets of the standard automation suite.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(5.0, 50.0, 3.0, 5),
            Self::new(10.0, 60.0, 5.0, 5),
            Self::new(3.0, 40.0, 2.0, 5),
            Self::new(8.0, 70.0, 4.0, 5),
            Self::new(15.0, 80.0, 6.0, 5),
            Self::new(5.0, 50.0, 3.0, 10),
            Self::new(5.0, 50.0, 3.0, 15),
            Self::new(5.0, 50.0, 3.0, 20),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub runs: u64,
    pub iterations: usize,
    pub seed: u64,
    pub initial_price: f64,
    pub trend_reversal_percentage: f64,
    pub walk: WalkConfig,
    pub parameter_sets: Vec<ParameterSet>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            runs: 20,
            iterations: 100,
            seed: 42,
            initial_price: 100.0,
            trend_reversal_percentage: 10.0,
            walk: WalkConfig::default(),
            parameter_sets: ParameterSet::defaults(),
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runs",
                reason: "must be at least 1".into(),
            });
        }
        if self.parameter_sets.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "parameter_sets",
                reason: "at least one parameter set is required".into(),
            });
        }
        validate_walk(&self.walk)?;
        for (i, set) in self.parameter_sets.iter().enumerate() {
            self.simulation_for(set).validate().map_err(|e| ConfigError::InvalidValue {
                field: "parameter_sets",
                reason: format!("set {}: {e}", i + 1),
            })?;
        }
        Ok(())
    }

    /// Parameter set used by a 1-based run number. `None` when there are no sets.
    pub fn parameter_set_for(&self, run: u64) -> Option<&ParameterSet> {
        let index = run
            .saturating_sub(1)
            .checked_rem(self.parameter_sets.len() as u64)?;
        self.parameter_sets.get(index as usize)
    }

    fn simulation_for(&self, set: &ParameterSet) -> SimulationConfig {
        SimulationConfig {
            assets: set.assets,
            iterations: self.iterations,
            initial_price: self.initial_price,
            trend_reversal_percentage: self.trend_reversal_percentage,
            seed: self.seed,
            thresholds: set.thresholds(),
            walk: self.walk,
        }
    }
}

/// Sweep executor.
pub struct Sweep {
    config: SweepConfig,
    parallel: bool,
}

impl Sweep {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn run(self) -> Result<SweepReport, RunError> {
        self.config.validate()?;

        let runs: Vec<u64> = (1..=self.config.runs).collect();
        let run_one = |&run: &u64| -> Result<SimulationResult, RunError> {
            let set = self
                .config
                .parameter_set_for(run)
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "parameter_sets",
                    reason: "at least one parameter set is required".into(),
                })?;
            run_simulation(&self.config.simulation_for(set), run, &mut NullSink)
        };

        tracing::info!(
            runs = self.config.runs,
            sets = self.config.parameter_sets.len(),
            parallel = self.parallel,
            "sweep started"
        );

        let mut results: Vec<SimulationResult> = if self.parallel {
            runs.par_iter().map(run_one).collect::<Result<Vec<_>, _>>()?
        } else {
            runs.iter().map(run_one).collect::<Result<Vec<_>, _>>()?
        };
        results.sort_by_key(|r| r.run_number);

        Ok(SweepReport {
            config: self.config,
            results,
        })
    }
}

/// Run a sweep on the rayon pool.
pub fn run_sweep(config: SweepConfig) -> Result<SweepReport, RunError> {
    Sweep::new(config).run()
}

/// All runs of a sweep, ordered by run number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub config: SweepConfig,
    pub results: Vec<SimulationResult>,
}

/// Results sorted by total value, best first. Ties keep input order.
pub fn rank_by_total_value(results: &[SimulationResult]) -> Vec<&SimulationResult> {
    let mut ranked: Vec<&SimulationResult> = results.iter().collect();
    ranked.sort_by(|a, b| b.total_value.total_cmp(&a.total_value));
    ranked
}

/// Mean total value, or 0 for no results.
pub fn average_total_value(results: &[SimulationResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.total_value).sum::<f64>() / results.len() as f64
}

impl SweepReport {
    pub fn ranked(&self) -> Vec<&SimulationResult> {
        rank_by_total_value(&self.results)
    }

    pub fn best(&self) -> Option<&SimulationResult> {
        self.ranked().first().copied()
    }

    pub fn worst(&self) -> Option<&SimulationResult> {
        self.ranked().last().copied()
    }

    pub fn average_total_value(&self) -> f64 {
        average_total_value(&self.results)
    }

    pub fn top(&self, n: usize) -> Vec<&SimulationResult> {
        self.ranked().into_iter().take(n).collect()
    }
}
