//! PriceLab Runner: simulations, OHLC replay, parameter sweeps, reports.
//!
//! This crate builds on `pricelab-core` to provide:
//! - TOML simulation configuration with validated defaults
//! - Seeded multi-asset random-walk simulations
//! - Replay of OHLC files through a single asset
//! - Parallel parameter sweeps with ranking
//! - JSON snapshots, position CSV and Markdown reports
//! - Re-analysis of saved snapshots

pub mod config;
pub mod export;
pub mod simulation;
pub mod sweep;

pub use config::{ConfigError, SimulationConfig};
pub use export::{
    export_positions_csv, generate_analysis_report, generate_report, generate_run_report,
    load_snapshot, load_snapshots, save_artifacts, save_history, save_snapshot,
    save_sweep_artifacts, ExportError,
};
pub use simulation::{
    asset_name, replay_ohlc, run_simulation, Activity, PriceSource, RunError, SimulationResult,
    SCHEMA_VERSION,
};
pub use sweep::{
    average_total_value, rank_by_total_value, run_sweep, ParameterSet, Sweep, SweepConfig,
    SweepReport,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SimulationConfig>();
        assert_sync::<SimulationConfig>();
        assert_send::<SweepConfig>();
        assert_sync::<SweepConfig>();
    }

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<SimulationResult>();
        assert_sync::<SimulationResult>();
        assert_send::<SweepReport>();
        assert_sync::<SweepReport>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
