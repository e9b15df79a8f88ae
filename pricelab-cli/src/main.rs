//! PriceLab CLI: simulation, sweep and replay commands.
//!
//! Commands:
//! - `simulate`: run one seeded portfolio simulation from defaults or a TOML config
//! - `sweep`: run the parameter-set suite and write an analysis report
//! - `replay`: drive a single asset through the closes of an OHLC file
//! - `analyze`: rank previously saved runs and write an analysis report
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use pricelab_core::feed::{is_valid_ohlc_path, read_ohlc_file};
use pricelab_core::{ActionHistory, ActionSink, NullSink, TickConfig};
use pricelab_runner::{
    average_total_value, generate_analysis_report, load_snapshots, rank_by_total_value,
    replay_ohlc, run_simulation, save_artifacts, save_history, save_sweep_artifacts,
    SimulationConfig, SimulationResult, Sweep, SweepConfig,
};

#[derive(Parser)]
#[command(
    name = "pricelab",
    about = "PriceLab CLI: threshold and stop-loss position simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one seeded portfolio simulation.
    Simulate {
        /// Path to a TOML config file. Defaults apply to anything it omits.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of assets (overrides the config).
        #[arg(long)]
        assets: Option<usize>,

        /// Number of iterations (overrides the config).
        #[arg(long)]
        iterations: Option<usize>,

        /// Master seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Record every engine decision and write history files next to the artifacts.
        #[arg(long, default_value_t = false)]
        history: bool,
    },
    /// Run the parameter-set suite and rank the results.
    Sweep {
        /// Number of runs. Run i uses parameter set (i - 1) mod 8.
        #[arg(long, default_value_t = 20)]
        runs: u64,

        /// Iterations per run.
        #[arg(long, default_value_t = 100)]
        iterations: usize,

        /// Master seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Replay the closes of an OHLC file (.csv or .tsv) through one asset.
    Replay {
        /// OHLC file: header line, then date, open, high, low, close.
        file: PathBuf,

        /// Upward threshold in percent.
        #[arg(long, default_value_t = 5.0)]
        upward: f64,

        /// Downward threshold in percent.
        #[arg(long, default_value_t = 50.0)]
        downward: f64,

        /// Stop-loss threshold in percent.
        #[arg(long, default_value_t = 3.0)]
        stop_loss: f64,

        /// Trend reversal band in percent.
        #[arg(long, default_value_t = 10.0)]
        reversal: f64,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Record every engine decision and write history files next to the artifacts.
        #[arg(long, default_value_t = false)]
        history: bool,
    },
    /// Rank the snapshots saved in a sweep or results directory.
    Analyze {
        /// Directory holding `*.json` snapshots or run artifact directories.
        dir: PathBuf,

        /// Where to write the Markdown report. Defaults to `DIR/analysis.md`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            assets,
            iterations,
            seed,
            output_dir,
            history,
        } => run_simulate_cmd(config, assets, iterations, seed, &output_dir, history),
        Commands::Sweep {
            runs,
            iterations,
            seed,
            output_dir,
        } => run_sweep_cmd(runs, iterations, seed, &output_dir),
        Commands::Replay {
            file,
            upward,
            downward,
            stop_loss,
            reversal,
            output_dir,
            history,
        } => {
            let thresholds = TickConfig {
                upward_threshold: upward,
                downward_threshold: downward,
                stop_loss_threshold: stop_loss,
            };
            run_replay_cmd(&file, thresholds, reversal, &output_dir, history)
        }
        Commands::Analyze { dir, output } => run_analyze_cmd(&dir, output),
    }
}

fn run_simulate_cmd(
    config_path: Option<PathBuf>,
    assets: Option<usize>,
    iterations: Option<usize>,
    seed: Option<u64>,
    output_dir: &Path,
    record_history: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => SimulationConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(assets) = assets {
        config.assets = assets;
    }
    if let Some(iterations) = iterations {
        config.iterations = iterations;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    tracing::info!(
        assets = config.assets,
        iterations = config.iterations,
        seed = config.seed,
        "running simulation"
    );

    let mut history = ActionHistory::new();
    let mut null = NullSink;
    let result = {
        let sink: &mut dyn ActionSink = if record_history {
            &mut history
        } else {
            &mut null
        };
        run_simulation(&config, 1, sink)?
    };

    print_summary(&result);

    let run_dir = save_artifacts(&result, &format!("seed{}", config.seed), output_dir)?;
    if record_history {
        save_history(&history, &run_dir)?;
        println!("History: {} actions recorded", history.len());
    }
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_sweep_cmd(runs: u64, iterations: usize, seed: u64, output_dir: &Path) -> Result<()> {
    let config = SweepConfig {
        runs,
        iterations,
        seed,
        ..SweepConfig::default()
    };
    let report = Sweep::new(config).run()?;

    print_ranking("Sweep Result", &report.results);

    let sweep_dir = save_sweep_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", sweep_dir.display());

    Ok(())
}

fn run_replay_cmd(
    file: &Path,
    thresholds: TickConfig,
    reversal: f64,
    output_dir: &Path,
    record_history: bool,
) -> Result<()> {
    if !is_valid_ohlc_path(file) {
        bail!(
            "unsupported file '{}': expected a .csv or .tsv OHLC file",
            file.display()
        );
    }
    thresholds
        .validate()
        .context("invalid replay thresholds")?;

    let bars = read_ohlc_file(file)?;
    if bars.is_empty() {
        bail!("no valid OHLC rows in {}", file.display());
    }
    tracing::info!(file = %file.display(), bars = bars.len(), "loaded OHLC data");

    let name = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "replay".to_string());

    let mut history = ActionHistory::new();
    let mut null = NullSink;
    let result = {
        let sink: &mut dyn ActionSink = if record_history {
            &mut history
        } else {
            &mut null
        };
        replay_ohlc(&bars, &name, reversal, &thresholds, sink)?
    };

    print_summary(&result);

    let run_dir = save_artifacts(&result, &name, output_dir)?;
    if record_history {
        save_history(&history, &run_dir)?;
        println!("History: {} actions recorded", history.len());
    }
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_analyze_cmd(dir: &Path, output: Option<PathBuf>) -> Result<()> {
    let results = load_snapshots(dir)?;
    if results.is_empty() {
        bail!("no snapshots found in {}", dir.display());
    }
    tracing::info!(dir = %dir.display(), runs = results.len(), "loaded snapshots");

    print_ranking("Snapshot Analysis", &results);

    let output = output.unwrap_or_else(|| dir.join("analysis.md"));
    std::fs::write(&output, generate_analysis_report(&results))
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Report saved to: {}", output.display());

    Ok(())
}

fn print_summary(result: &SimulationResult) {
    let p = &result.parameters;
    println!();
    println!("=== Simulation Result ===");
    println!("Assets:         {}", result.asset_count());
    println!("Iterations:     {}", result.iterations);
    println!(
        "Thresholds:     up {:.2}% / down {:.2}% / stop {:.2}%",
        p.upward_threshold, p.downward_threshold, p.stop_loss_threshold
    );
    println!("Positions:      {}", result.portfolio.position_count());
    println!("Opened:         {}", result.activity.opened);
    println!("Closed:         {}", result.activity.closed);
    println!("Reversals:      {}", result.activity.reversals);
    println!();
    println!("--- Values ---");
    println!("Active:         {:.2}", result.active_value);
    println!("Closed:         {:.2}", result.closed_value);
    println!("Total:          {:.2}", result.total_value);
    println!();
}

fn print_ranking(title: &str, results: &[SimulationResult]) {
    let ranked = rank_by_total_value(results);
    println!();
    println!("=== {title} ===");
    println!("Runs:           {}", results.len());
    if let (Some(best), Some(worst)) = (ranked.first(), ranked.last()) {
        println!(
            "Best:           run {} ({:.2})",
            best.run_number, best.total_value
        );
        println!(
            "Worst:          run {} ({:.2})",
            worst.run_number, worst.total_value
        );
    }
    println!("Average:        {:.2}", average_total_value(results));
    println!();
    println!("{:<5} {:>6} {:>7} {:>7} {:>7} {:>12}", "Rank", "Run", "Up %", "Down %", "Stop %", "Total");
    println!("{}", "-".repeat(49));
    for (rank, r) in ranked.iter().take(3).enumerate() {
        println!(
            "{:<5} {:>6} {:>7.1} {:>7.1} {:>7.1} {:>12.2}",
            rank + 1,
            r.run_number,
            r.parameters.upward_threshold,
            r.parameters.downward_threshold,
            r.parameters.stop_loss_threshold,
            r.total_value
        );
    }
    println!();
}
