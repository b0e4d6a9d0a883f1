use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{System, TurtleConfig};
use crate::domain::{round_to_tick, Bar};
use crate::indicators::{atr, donchian_high, donchian_low};
use crate::sizers::calc_unit_qty;

use super::LiveError;

/// System 2 stop levels as of the latest completed bar, for the next session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLevels {
    pub asof_date: NaiveDate,
    pub n: f64,
    pub long_entry: Option<f64>,
    pub short_entry: Option<f64>,
    /// Exit for an open long: the low of the exit window.
    pub long_exit: Option<f64>,
    /// Exit for an open short: the high of the exit window.
    pub short_exit: Option<f64>,
}

/// Compute tick-rounded System 2 levels from `bars`.
///
/// Donchian windows exclude the latest bar, matching the channels the
/// backtest tests that bar against.
pub fn compute_levels(config: &TurtleConfig, bars: &[Bar]) -> Result<SignalLevels, LiveError> {
    config.validate()?;
    let last = bars.last().ok_or(LiveError::NoBars)?;
    let strategy = &config.strategy;
    if strategy.system != System::S2 {
        return Err(LiveError::UnsupportedSystem(strategy.system));
    }

    let n = atr(bars, strategy.atr_period)?
        .last()
        .copied()
        .flatten()
        .ok_or(LiveError::InsufficientHistory {
            have: bars.len(),
            need: strategy.atr_period,
        })?;

    let tick = config.instrument.tick_size;
    let level = |series: Vec<Option<f64>>| -> Option<f64> {
        series.last().copied().flatten().map(|v| round_to_tick(v, tick))
    };

    Ok(SignalLevels {
        asof_date: last.date,
        n,
        long_entry: level(donchian_high(bars, strategy.s2_entry_breakout)?),
        short_entry: level(donchian_low(bars, strategy.s2_entry_breakout)?),
        long_exit: level(donchian_low(bars, strategy.s2_exit_breakout)?),
        short_exit: level(donchian_high(bars, strategy.s2_exit_breakout)?),
    })
}

/// Contracts per unit at `equity` and volatility `n`.
pub fn compute_unit_qty(config: &TurtleConfig, equity: f64, n: f64) -> u64 {
    calc_unit_qty(
        equity,
        config.account.risk_per_unit_pct,
        Some(n),
        config.instrument.point_value,
        config.account.stop_loss_n,
    )
}
