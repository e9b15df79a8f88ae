//! Simulation runner: drives a portfolio through a price feed tick by tick.
//!
//! Two entry points:
//! - `run_simulation()`: N assets on seeded random walks. Used by `simulate` and sweeps.
//! - `replay_ohlc()`: one asset replaying the closes of an OHLC series.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pricelab_core::feed::{OhlcBar, OhlcFeed, PriceFeed, RandomWalk, WalkConfig};
use pricelab_core::{
    process_tick, ActionSink, Asset, Portfolio, RngHierarchy, TickConfig, TickError, TickOutcome,
};

use crate::config::{ConfigError, SimulationConfig};

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Display names handed out to simulated assets, in order.
pub const ASSET_NAMES: [&str; 32] = [
    "Apple", "Banana", "Cherry", "Dragon", "Elephant", "Flower", "Guitar", "Harmony", "Iris",
    "Jungle", "Kite", "Lion", "Mountain", "Night", "Ocean", "Piano", "Queen", "River", "Sun",
    "Tree", "Umbrella", "Violin", "Water", "Xylophone", "Yacht", "Zebra", "Air", "Beam", "Cloud",
    "Dance", "Eagle", "Fire",
];

/// Name for the asset at `index`. Names repeat with a numeric suffix once the list runs out.
pub fn asset_name(index: usize) -> String {
    let word = ASSET_NAMES[index % ASSET_NAMES.len()];
    match index / ASSET_NAMES.len() {
        0 => word.to_string(),
        round => format!("{word} {}", round + 1),
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("tick rejected: {0}")]
    Tick(#[from] TickError),

    #[error("price feed for '{asset}' ran dry at iteration {iteration}")]
    FeedExhausted { asset: String, iteration: usize },

    #[error("price series is empty")]
    EmptySeries,
}

/// Where a run's prices came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    RandomWalk { seed: u64, walk: WalkConfig },
    Ohlc { bars: usize },
}

/// Transition counts accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub ticks: usize,
    pub opened: usize,
    pub stops_adjusted: usize,
    pub closed: usize,
    pub reversals: usize,
    /// Ticks on which nothing changed.
    #[serde(default)]
    pub quiet_ticks: usize,
}

impl Activity {
    fn absorb(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        self.opened += outcome.opened;
        self.stops_adjusted += outcome.stops_adjusted;
        self.closed += outcome.closed;
        if outcome.reversal_latched {
            self.reversals += 1;
        }
        if outcome.is_quiet() {
            self.quiet_ticks += 1;
        }
    }
}

/// Complete result of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_number: u64,
    pub source: PriceSource,
    pub iterations: usize,
    pub trend_reversal_percentage: f64,
    pub parameters: TickConfig,
    pub portfolio: Portfolio,
    pub activity: Activity,
    pub active_value: f64,
    pub closed_value: f64,
    pub total_value: f64,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl SimulationResult {
    fn new(
        run_number: u64,
        source: PriceSource,
        iterations: usize,
        trend_reversal_percentage: f64,
        portfolio: Portfolio,
        activity: Activity,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_number,
            source,
            iterations,
            trend_reversal_percentage,
            parameters: portfolio.thresholds,
            active_value: portfolio.active_positions_value(),
            closed_value: portfolio.closed_positions_value(),
            total_value: portfolio.total_value(),
            portfolio,
            activity,
        }
    }

    pub fn asset_count(&self) -> usize {
        self.portfolio.assets.len()
    }
}

/// Run one seeded random-walk simulation.
///
/// Each asset starts at `initial_price` with a bootstrap position, then every
/// iteration draws one price per asset and processes the tick. Asset `i` of run
/// `run_number` always sees the same price path for a given seed.
pub fn run_simulation(
    config: &SimulationConfig,
    run_number: u64,
    sink: &mut dyn ActionSink,
) -> Result<SimulationResult, RunError> {
    config.validate()?;

    let hierarchy = RngHierarchy::new(config.seed);
    let mut portfolio = Portfolio::new(config.thresholds);
    let mut feeds = Vec::with_capacity(config.assets);
    let mut activity = Activity::default();

    for index in 0..config.assets {
        let mut asset = Asset::new(
            asset_name(index),
            config.initial_price,
            config.trend_reversal_percentage,
        );
        let outcome = process_tick(&mut asset, &config.thresholds, sink)?;
        activity.absorb(&outcome);
        portfolio.assets.push(asset);
        feeds.push(RandomWalk::new(
            config.walk,
            hierarchy.rng_for(run_number, index as u64),
        ));
    }

    tracing::debug!(
        run = run_number,
        assets = config.assets,
        iterations = config.iterations,
        "simulation started"
    );

    for iteration in 0..config.iterations {
        for (asset, feed) in portfolio.assets.iter_mut().zip(feeds.iter_mut()) {
            let outcome = step(asset, feed, &config.thresholds, iteration, sink)?;
            activity.absorb(&outcome);
        }
    }

    let result = SimulationResult::new(
        run_number,
        PriceSource::RandomWalk {
            seed: config.seed,
            walk: config.walk,
        },
        config.iterations,
        config.trend_reversal_percentage,
        portfolio,
        activity,
    );

    tracing::info!(
        run = run_number,
        positions = result.portfolio.position_count(),
        total_value = result.total_value,
        "simulation finished"
    );

    Ok(result)
}

/// Replay an OHLC series through a single asset.
///
/// The first close seeds the asset and its bootstrap position; every later close
/// is one tick.
pub fn replay_ohlc(
    bars: &[OhlcBar],
    name: &str,
    trend_reversal_percentage: f64,
    thresholds: &TickConfig,
    sink: &mut dyn ActionSink,
) -> Result<SimulationResult, RunError> {
    let (first, rest) = bars.split_first().ok_or(RunError::EmptySeries)?;

    let mut asset = Asset::new(name, first.close, trend_reversal_percentage);
    let mut activity = Activity::default();
    activity.absorb(&process_tick(&mut asset, thresholds, sink)?);

    let mut feed = OhlcFeed::new(rest);
    for iteration in 0..feed.remaining() {
        let outcome = step(&mut asset, &mut feed, thresholds, iteration, sink)?;
        activity.absorb(&outcome);
    }

    let mut portfolio = Portfolio::new(*thresholds);
    portfolio.assets.push(asset);

    tracing::info!(
        asset = name,
        bars = bars.len(),
        opened = activity.opened,
        closed = activity.closed,
        "replay finished"
    );

    Ok(SimulationResult::new(
        1,
        PriceSource::Ohlc { bars: bars.len() },
        rest.len(),
        trend_reversal_percentage,
        portfolio,
        activity,
    ))
}

fn step(
    asset: &mut Asset,
    feed: &mut dyn PriceFeed,
    thresholds: &TickConfig,
    iteration: usize,
    sink: &mut dyn ActionSink,
) -> Result<TickOutcome, RunError> {
    let price = feed
        .next_price(asset.price)
        .ok_or_else(|| RunError::FeedExhausted {
            asset: asset.name.clone(),
            iteration,
        })?;
    asset.advance(price);
    Ok(process_tick(asset, thresholds, sink)?)
}
