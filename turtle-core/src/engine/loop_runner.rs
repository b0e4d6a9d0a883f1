//! Bar-by-bar backtest loop.
//!
//! Per bar:
//! 1. Mark to market: realized equity + unrealized P&L at the close
//! 2. Warm-up check: skip the state machine while ATR is undefined
//! 3. State machine: stop, channel exit, pyramid, or entry
//!
//! Donchian levels at bar `i` come from bars `< i` only and fills happen at
//! the triggering level, so no decision ever sees the future.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::TurtleConfig;
use crate::domain::{Bar, EquityPoint, OpenPosition, Trade};

use super::precompute::Channels;
use super::state::TurtleState;
use super::EngineError;

/// Everything a single backtest produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    /// Position still open after the last bar. It is not force-closed.
    pub open_position: Option<OpenPosition>,
    pub warmup_bars: usize,
    /// Realized equity after the last close.
    pub realized_equity: f64,
}

/// Run a backtest over `bars` with `config`.
///
/// Deterministic: identical inputs always produce identical outputs.
pub fn run_backtest(config: &TurtleConfig, bars: &[Bar]) -> Result<BacktestOutput, EngineError> {
    config.validate()?;
    let channels = Channels::compute(bars, &config.strategy)?;

    let mut state = TurtleState::new(config);
    let mut equity = config.account.starting_equity;
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut trades = Vec::new();

    for (i, bar) in bars.iter().enumerate() {
        equity_curve.push(EquityPoint {
            date: bar.date,
            equity: equity + state.unrealized_pnl(bar.close),
        });

        if channels.n[i].is_none() {
            continue;
        }

        if let Some(trade) = state.on_bar(i, bar, &channels, equity) {
            equity += trade.pnl_after_costs;
            trades.push(trade);
        }
    }

    info!(
        symbol = %config.instrument.symbol,
        bars = bars.len(),
        trades = trades.len(),
        final_equity = equity,
        "backtest complete"
    );

    Ok(BacktestOutput {
        equity_curve,
        trades,
        open_position: state.into_position().as_open().cloned(),
        warmup_bars: channels.warmup_bars,
        realized_equity: equity,
    })
}
