//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip snapshots of a run, with schema versioning
//! - **CSV**: the position ledger, one row per position
//! - **Markdown**: a single-run report and a ranked analysis of many runs
//!
//! Snapshots carry a `schema_version`. Versions newer than this build are
//! rejected on load with [`ExportError::UnsupportedSchemaVersion`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use pricelab_core::{ActionHistory, Portfolio};

use crate::simulation::{PriceSource, SimulationResult, SCHEMA_VERSION};
use crate::sweep::{average_total_value, rank_by_total_value, SweepReport};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchemaVersion { found: u32, supported: u32 },
}

// ─── JSON snapshots ─────────────────────────────────────────────────

pub fn export_json(result: &SimulationResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize SimulationResult to JSON")
}

/// Deserialize a snapshot, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<SimulationResult> {
    let result: SimulationResult =
        serde_json::from_str(json).context("failed to deserialize SimulationResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchemaVersion {
            found: result.schema_version,
            supported: SCHEMA_VERSION,
        }
        .into());
    }
    Ok(result)
}

pub fn save_snapshot(result: &SimulationResult, path: &Path) -> Result<()> {
    let json = export_json(result)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_snapshot(path: &Path) -> Result<SimulationResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Load every snapshot saved under `dir`, ordered by path.
///
/// Picks up `*.json` files directly in `dir` (a sweep directory) and
/// `snapshot.json` inside each subdirectory (run artifact directories).
/// History files are skipped.
pub fn load_snapshots(dir: &Path) -> Result<Vec<SimulationResult>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        if path.is_dir() {
            let snapshot = path.join("snapshot.json");
            if snapshot.is_file() {
                paths.push(snapshot);
            }
        } else if path.extension().is_some_and(|ext| ext == "json")
            && path.file_name().is_some_and(|name| name != "history.json")
        {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|path| load_snapshot(path)).collect()
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export every position of every asset as CSV.
///
/// Columns: asset, index, opening_price, quantity, stop_loss, is_active
///
/// An unset stop is written as an empty field.
pub fn export_positions_csv(portfolio: &Portfolio) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "asset",
        "index",
        "opening_price",
        "quantity",
        "stop_loss",
        "is_active",
    ])?;

    for asset in &portfolio.assets {
        for (i, p) in asset.positions.iter().enumerate() {
            wtr.write_record([
                &asset.name,
                &i.to_string(),
                &format!("{:.6}", p.opening_price),
                &format!("{:.6}", p.quantity),
                &p.stop_loss.map(|s| format!("{s:.6}")).unwrap_or_default(),
                &p.is_active.to_string(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundles ───────────────────────────────────────────────

fn timestamped_dir(output_dir: &Path, label: &str) -> Result<PathBuf> {
    let dirname = format!("{}_{}", label, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let dir = output_dir.join(dirname);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;
    Ok(dir)
}

/// Save the artifact set for a single run.
///
/// Creates `{label}_{timestamp}/` under `output_dir` containing:
/// - `snapshot.json`: the full `SimulationResult`
/// - `positions.csv`: the position ledger
/// - `report.md`: the single-run report
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &SimulationResult, label: &str, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = timestamped_dir(output_dir, label)?;

    save_snapshot(result, &run_dir.join("snapshot.json"))?;
    std::fs::write(
        run_dir.join("positions.csv"),
        export_positions_csv(&result.portfolio)?,
    )?;
    std::fs::write(run_dir.join("report.md"), generate_run_report(result))?;

    tracing::info!(dir = %run_dir.display(), "saved run artifacts");
    Ok(run_dir)
}

/// Save a sweep: `run_{n}.json` per run plus `report.md`, under `sweep_{timestamp}/`.
pub fn save_sweep_artifacts(report: &SweepReport, output_dir: &Path) -> Result<PathBuf> {
    let sweep_dir = timestamped_dir(output_dir, "sweep")?;

    for result in &report.results {
        save_snapshot(
            result,
            &sweep_dir.join(format!("run_{:02}.json", result.run_number)),
        )?;
    }
    std::fs::write(sweep_dir.join("report.md"), generate_report(report))?;

    tracing::info!(
        dir = %sweep_dir.display(),
        runs = report.results.len(),
        "saved sweep artifacts"
    );
    Ok(sweep_dir)
}

/// Write the action history as `history.json`, `history.txt` and `history.csv`.
pub fn save_history(history: &ActionHistory, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create history dir: {}", dir.display()))?;
    std::fs::write(dir.join("history.json"), history.export_json()?)?;
    std::fs::write(dir.join("history.txt"), history.export_text()?)?;
    std::fs::write(dir.join("history.csv"), history.export_csv()?)?;
    Ok(())
}

// ─── Markdown reports ───────────────────────────────────────────────

fn format_source(source: &PriceSource) -> String {
    match source {
        PriceSource::RandomWalk { seed, walk } => format!(
            "random walk (seed {seed}, max step {:.2}, floor {:.2})",
            walk.max_step, walk.floor
        ),
        PriceSource::Ohlc { bars } => format!("OHLC replay ({bars} bars)"),
    }
}

/// Markdown report for one run.
pub fn generate_run_report(result: &SimulationResult) -> String {
    let mut md = String::with_capacity(2048);
    let p = &result.parameters;

    md.push_str(&format!("# Simulation Report: Run {}\n\n", result.run_number));

    md.push_str("## Parameters\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Source | {} |\n", format_source(&result.source)));
    md.push_str(&format!("| Assets | {} |\n", result.asset_count()));
    md.push_str(&format!("| Iterations | {} |\n", result.iterations));
    md.push_str(&format!("| Upward Threshold | {:.2}% |\n", p.upward_threshold));
    md.push_str(&format!("| Downward Threshold | {:.2}% |\n", p.downward_threshold));
    md.push_str(&format!("| Stop Loss Threshold | {:.2}% |\n", p.stop_loss_threshold));
    md.push_str(&format!(
        "| Trend Reversal | {:.2}% |\n\n",
        result.trend_reversal_percentage
    ));

    md.push_str("## Values\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Active Value | {:.2} |\n", result.active_value));
    md.push_str(&format!("| Closed Value | {:.2} |\n", result.closed_value));
    md.push_str(&format!("| Total Value | {:.2} |\n\n", result.total_value));

    md.push_str("## Activity\n\n");
    md.push_str(&format!(
        "{} ticks ({} quiet), {} positions opened, {} stop adjustments, {} positions closed, {} reversals.\n\n",
        result.activity.ticks,
        result.activity.quiet_ticks,
        result.activity.opened,
        result.activity.stops_adjusted,
        result.activity.closed,
        result.activity.reversals
    ));

    md.push_str("## Assets\n\n");
    md.push_str("| Asset | Price | Active | Closed | Status | Reversed |\n");
    md.push_str("| --- | ---: | ---: | ---: | --- | --- |\n");
    for asset in &result.portfolio.assets {
        md.push_str(&format!(
            "| {} | {:.2} | {} | {} | {} | {} |\n",
            asset.name,
            asset.price,
            asset.active_positions(),
            asset.closed_positions(),
            asset.position_status(),
            if asset.trend_reversed { "yes" } else { "no" }
        ));
    }

    md
}

/// Markdown analysis of a sweep: summary statistics, a per-run table, and the top performers.
pub fn generate_report(report: &SweepReport) -> String {
    let mut md = String::with_capacity(4096);

    md.push_str("# Sweep Analysis Report\n\n");
    md.push_str(&format!(
        "{} runs, {} iterations each, seed {}.\n\n",
        report.results.len(),
        report.config.iterations,
        report.config.seed
    ));
    push_results_analysis(&mut md, &report.results);

    md
}

/// Markdown analysis of previously saved runs, laid out like the sweep report.
pub fn generate_analysis_report(results: &[SimulationResult]) -> String {
    let mut md = String::with_capacity(4096);

    md.push_str("# Snapshot Analysis Report\n\n");
    md.push_str(&format!("{} saved runs.\n\n", results.len()));
    push_results_analysis(&mut md, results);

    md
}

fn push_results_analysis(md: &mut String, results: &[SimulationResult]) {
    let ranked = rank_by_total_value(results);

    md.push_str("## Summary Statistics\n\n");
    md.push_str("| Metric | Run | Total Value |\n");
    md.push_str("| --- | ---: | ---: |\n");
    if let (Some(best), Some(worst)) = (ranked.first(), ranked.last()) {
        md.push_str(&format!(
            "| Best | {} | {:.2} |\n",
            best.run_number, best.total_value
        ));
        md.push_str(&format!(
            "| Worst | {} | {:.2} |\n",
            worst.run_number, worst.total_value
        ));
    }
    md.push_str(&format!(
        "| Average | - | {:.2} |\n\n",
        average_total_value(results)
    ));

    md.push_str("## Detailed Results\n\n");
    md.push_str("| Run | Assets | Up % | Down % | Stop % | Positions | Active | Closed | Total |\n");
    md.push_str("| ---: | ---: | ---: | ---: | ---: | ---: | ---: | ---: | ---: |\n");
    for r in results {
        md.push_str(&format!(
            "| {} | {} | {:.1} | {:.1} | {:.1} | {} | {:.2} | {:.2} | {:.2} |\n",
            r.run_number,
            r.asset_count(),
            r.parameters.upward_threshold,
            r.parameters.downward_threshold,
            r.parameters.stop_loss_threshold,
            r.portfolio.position_count(),
            r.active_value,
            r.closed_value,
            r.total_value
        ));
    }
    md.push('\n');

    md.push_str("## Top Performers\n\n");
    for (rank, r) in ranked.iter().take(3).enumerate() {
        md.push_str(&format!(
            "{}. Run {}: total {:.2} (up {:.1}%, down {:.1}%, stop {:.1}%, {} assets)\n",
            rank + 1,
            r.run_number,
            r.total_value,
            r.parameters.upward_threshold,
            r.parameters.downward_threshold,
            r.parameters.stop_loss_threshold,
            r.asset_count()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricelab_core::{Asset, Position, TickConfig};

    fn portfolio() -> Portfolio {
        let mut asset = Asset::new("Apple", 100.0, 10.0);
        asset.positions.push(Position::open(100.0));
        let mut closed = Position::open(110.0);
        closed.stop_loss = Some(106.7);
        closed.close();
        asset.positions.push(closed);

        let mut portfolio = Portfolio::new(TickConfig::default());
        portfolio.assets.push(asset);
        portfolio
    }

    #[test]
    fn positions_csv_columns() {
        let csv = export_positions_csv(&portfolio()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "asset,index,opening_price,quantity,stop_loss,is_active"
        );
        assert_eq!(lines[1], "Apple,0,100.000000,1.000000,,true");
        assert_eq!(lines[2], "Apple,1,110.000000,1.000000,106.700000,false");
    }

    #[test]
    fn empty_portfolio_csv_has_header_only() {
        let csv = export_positions_csv(&Portfolio::new(TickConfig::default())).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
