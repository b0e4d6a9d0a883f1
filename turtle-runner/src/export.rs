//! Reporting and export: JSON and CSV artifact generation.
//!
//! Provides two export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade ledger and equity curve for external analysis tools
//!
//! Persisted JSON includes a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;
use turtle_core::domain::{EquityPoint, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

pub const EQUITY_FILE: &str = "equity_curve.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const RESULT_FILE: &str = "result.json";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger as CSV.
///
/// Columns: symbol, entry_date, entry_price, exit_date, exit_price, side,
/// qty, units, pnl, pnl_after_costs, reason. An empty ledger still gets
/// the header row.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "side",
        "qty",
        "units",
        "pnl",
        "pnl_after_costs",
        "reason",
    ])?;

    for t in trades {
        wtr.write_record([
            t.symbol.clone(),
            t.entry_date.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_date.to_string(),
            format!("{:.6}", t.exit_price),
            t.side.as_str().to_string(),
            t.qty.to_string(),
            t.units.to_string(),
            format!("{:.2}", t.pnl),
            format!("{:.2}", t.pnl_after_costs),
            t.reason.as_str().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with date and equity columns.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"])?;
    for p in equity_curve {
        wtr.write_record([p.date.to_string(), format!("{:.2}", p.equity)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a single backtest run into `output_dir`:
/// - `equity_curve.csv`: date, equity
/// - `trades.csv`: the trade ledger
/// - `summary.json`: the summary block
/// - `result.json`: the full `BacktestResult`
///
/// Returns `output_dir`.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    let write = |name: &str, contents: String| -> Result<()> {
        let path = output_dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
    };

    write(EQUITY_FILE, export_equity_csv(&result.equity_curve)?)?;
    write(TRADES_FILE, export_trades_csv(&result.trades)?)?;
    write(
        SUMMARY_FILE,
        serde_json::to_string_pretty(&result.summary).context("failed to serialize summary")?,
    )?;
    write(RESULT_FILE, export_json(result)?)?;

    info!(dir = %output_dir.display(), "artifacts saved");
    Ok(output_dir.to_path_buf())
}

/// Load a `BacktestResult` from an artifact directory's `result.json`.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join(RESULT_FILE);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
