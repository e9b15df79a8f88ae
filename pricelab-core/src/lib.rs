//! PriceLab Core: position ledger, threshold engine, stop-loss engine, price feeds.
//!
//! This crate contains the per-asset position lifecycle state machine:
//! - Domain types (positions, assets, portfolios)
//! - Threshold engine: opens positions on threshold crossings, with a
//!   trend-reversal guard and scale-in re-entries
//! - Stop-loss engine: ratchets protective stops upward and closes breached positions
//! - Tick orchestration with boundary validation
//! - Diagnostics sink for observing every decision
//! - Price feeds (seeded random walk, OHLC files) and a deterministic RNG hierarchy

pub mod domain;
pub mod engine;
pub mod events;
pub mod feed;
pub mod rng;

pub use domain::{Asset, Portfolio, Position, PositionStatus};
pub use engine::{
    apply_stop_loss, evaluate_thresholds, process_tick, TickConfig, TickError, TickOutcome,
};
pub use events::{
    ActionEvent, ActionHistory, ActionKind, ActionSink, HistoryError, NullSink, OpenReason,
    RecordedAction,
};
pub use feed::{OhlcBar, OhlcFeed, PriceFeed, RandomWalk, WalkConfig};
pub use rng::RngHierarchy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: domain and engine types can cross thread boundaries.
    ///
    /// The runner executes sweeps on a rayon pool, one portfolio per run.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Position>();
        require_sync::<Position>();
        require_send::<Asset>();
        require_sync::<Asset>();
        require_send::<Portfolio>();
        require_sync::<Portfolio>();
        require_send::<TickConfig>();
        require_sync::<TickConfig>();
        require_send::<TickOutcome>();
        require_sync::<TickOutcome>();
        require_send::<ActionHistory>();
        require_sync::<ActionHistory>();
        require_send::<feed::RandomWalk>();
        require_sync::<feed::RandomWalk>();
        require_send::<feed::OhlcFeed>();
        require_sync::<feed::OhlcFeed>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
    }

    /// Architecture contract: the sink is passed in, never reached through a global.
    #[test]
    fn engines_take_an_injected_sink() {
        fn _check(asset: &mut Asset, sink: &mut dyn ActionSink) {
            evaluate_thresholds(asset, 5.0, 50.0, sink);
            apply_stop_loss(asset, 1.0, 3.0, sink);
        }
    }
}
