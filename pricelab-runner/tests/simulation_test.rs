//! Simulation and replay runs end to end.

use pricelab_core::feed::{parse_ohlc, OhlcBar};
use pricelab_core::{ActionHistory, NullSink, TickConfig};
use pricelab_runner::{replay_ohlc, run_simulation, PriceSource, RunError, SimulationConfig};

fn small_config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        assets: 3,
        iterations: 50,
        seed,
        ..SimulationConfig::default()
    }
}

fn bar(close: f64) -> OhlcBar {
    OhlcBar {
        date: "2024-01-02".into(),
        open: close,
        high: close,
        low: close,
        close,
    }
}

#[test]
fn same_seed_same_result() {
    let a = run_simulation(&small_config(42), 1, &mut NullSink).unwrap();
    let b = run_simulation(&small_config(42), 1, &mut NullSink).unwrap();
    assert_eq!(a, b);
}

#[test]
fn different_run_numbers_walk_different_paths() {
    let a = run_simulation(&small_config(42), 1, &mut NullSink).unwrap();
    let b = run_simulation(&small_config(42), 2, &mut NullSink).unwrap();
    let prices_a: Vec<f64> = a.portfolio.assets.iter().map(|x| x.price).collect();
    let prices_b: Vec<f64> = b.portfolio.assets.iter().map(|x| x.price).collect();
    assert_ne!(prices_a, prices_b);
}

#[test]
fn result_values_match_portfolio() {
    let result = run_simulation(&small_config(7), 1, &mut NullSink).unwrap();
    assert_eq!(result.active_value, result.portfolio.active_positions_value());
    assert_eq!(result.closed_value, result.portfolio.closed_positions_value());
    assert_eq!(result.total_value, result.closed_value - result.active_value);
    assert_eq!(result.activity.ticks, 3 + 3 * 50);
    assert_eq!(result.activity.opened, result.portfolio.position_count());
    assert_eq!(result.parameters, TickConfig::default());
    assert!(matches!(result.source, PriceSource::RandomWalk { seed: 7, .. }));

    let names: Vec<&str> = result
        .portfolio
        .assets
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, ["Apple", "Banana", "Cherry"]);
}

#[test]
fn prices_never_fall_below_floor() {
    let mut config = small_config(3);
    config.iterations = 500;
    let result = run_simulation(&config, 1, &mut NullSink).unwrap();
    for asset in &result.portfolio.assets {
        assert!(asset.price >= config.walk.floor);
        for p in &asset.positions {
            assert!(p.opening_price >= config.walk.floor);
        }
    }
}

#[test]
fn recording_history_does_not_change_the_run() {
    let quiet = run_simulation(&small_config(11), 4, &mut NullSink).unwrap();
    let mut history = ActionHistory::new();
    let observed = run_simulation(&small_config(11), 4, &mut history).unwrap();

    assert_eq!(quiet, observed);
    let opens = history
        .actions()
        .iter()
        .filter(|a| a.event.kind.label() == "position_opened")
        .count();
    assert_eq!(opens, observed.portfolio.position_count());
}

#[test]
fn replay_walks_the_closes() {
    let bars = vec![bar(100.0), bar(110.0), bar(95.0)];
    let result = replay_ohlc(&bars, "SPY", 10.0, &TickConfig::default(), &mut NullSink).unwrap();

    let asset = &result.portfolio.assets[0];
    assert_eq!(asset.name, "SPY");
    assert_eq!(asset.price, 95.0);
    assert_eq!(asset.positions.len(), 2);
    // The bootstrap position's stop (106.7) was breached at 95.
    assert!(!asset.positions[0].is_active);
    assert!(asset.positions[1].is_active);
    // Ceiling recomputed from the protected bootstrap position when the drop reset the reversal.
    assert_eq!(asset.highest_opening_price, 100.0);

    assert_eq!(result.iterations, 2);
    assert_eq!(result.activity.opened, 2);
    assert_eq!(result.activity.closed, 1);
    assert_eq!(result.activity.quiet_ticks, 0);
    assert_eq!(result.total_value, 100.0 - 110.0);
    assert_eq!(result.source, PriceSource::Ohlc { bars: 3 });
}

#[test]
fn flat_closes_are_quiet_ticks() {
    let bars = vec![bar(100.0), bar(100.0), bar(100.0)];
    let result = replay_ohlc(&bars, "SPY", 10.0, &TickConfig::default(), &mut NullSink).unwrap();

    assert_eq!(result.activity.ticks, 3);
    // Only the bootstrap tick does anything.
    assert_eq!(result.activity.quiet_ticks, 2);
    assert_eq!(result.portfolio.position_count(), 1);
}

#[test]
fn replay_from_parsed_file_content() {
    let content = "Date,Open,High,Low,Close\n\
                   2024-01-02,100,101,99,100\n\
                   2024-01-03,100,107,100,106\n";
    let bars = parse_ohlc(content, b',').unwrap();
    let result = replay_ohlc(&bars, "SPY", 10.0, &TickConfig::default(), &mut NullSink).unwrap();
    assert_eq!(result.portfolio.position_count(), 2);
}

#[test]
fn replay_rejects_non_positive_close() {
    let bars = vec![bar(100.0), bar(0.0)];
    let err = replay_ohlc(&bars, "SPY", 10.0, &TickConfig::default(), &mut NullSink).unwrap_err();
    assert!(matches!(err, RunError::Tick(_)));
}
