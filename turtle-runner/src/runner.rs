//! Backtest runner: wires together data, engine, and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: takes pre-loaded bars, no I/O.
//! - `run_from_source()`: resolves bars through a `BarSource` first. Used by the CLI.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use turtle_core::config::{ConfigError, TurtleConfig};
use turtle_core::domain::{Bar, EquityPoint, OpenPosition, Trade};
use turtle_core::engine::{run_backtest, EngineError};

use crate::data_loader::{dataset_hash, BarSource, LoadError};
use crate::metrics::Summary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("no bars for '{0}'")]
    NoBars(String),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub summary: Summary,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub open_position: Option<OpenPosition>,
    pub start_date: String,
    pub end_date: String,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub config_hash: String,
    pub dataset_hash: String,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// BLAKE3 of config hash + dataset hash: identical inputs share a run id.
    pub fn run_id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.config_hash.as_bytes());
        hasher.update(self.dataset_hash.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Run a backtest on pre-loaded bars. No I/O.
pub fn run_single_backtest(config: &TurtleConfig, bars: &[Bar]) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let symbol = config.instrument.symbol.clone();
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(f), Some(l)) => (f.date, l.date),
        _ => return Err(RunError::NoBars(symbol)),
    };

    let output = run_backtest(config, bars)?;
    let summary = Summary::compute(
        &output.equity_curve,
        &output.trades,
        config.account.starting_equity,
    );

    info!(
        %symbol,
        trades = summary.trades,
        ending_equity = summary.ending_equity,
        total_return_pct = summary.total_return_pct,
        "run summarized"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol,
        summary,
        trades: output.trades,
        equity_curve: output.equity_curve,
        open_position: output.open_position,
        start_date: first.to_string(),
        end_date: last.to_string(),
        bar_count: bars.len(),
        warmup_bars: output.warmup_bars,
        config_hash: config.config_hash(),
        dataset_hash: dataset_hash(bars),
    })
}

/// Load bars for the configured instrument from `source`, then run.
///
/// The config is validated before any bars are read.
pub fn run_from_source(
    config: &TurtleConfig,
    source: &dyn BarSource,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let bars = source.daily_bars(&config.instrument)?;
    run_single_backtest(config, &bars)
}
