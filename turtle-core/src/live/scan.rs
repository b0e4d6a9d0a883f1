use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::TurtleConfig;
use crate::domain::Bar;

use super::levels::compute_levels;
use super::LiveError;

/// One instrument's breakout status on its latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    pub symbol: String,
    pub exchange: String,
    pub currency: String,
    pub asof_date: NaiveDate,
    pub n: f64,
    pub last_open: f64,
    pub last_high: f64,
    pub last_low: f64,
    pub last_close: f64,
    pub long_entry: Option<f64>,
    pub short_entry: Option<f64>,
    pub long_triggered: bool,
    pub short_triggered: bool,
}

impl ScanRow {
    pub fn is_triggered(&self) -> bool {
        self.long_triggered || self.short_triggered
    }
}

/// Bars required before an instrument is scanned.
pub fn min_scan_bars(config: &TurtleConfig) -> usize {
    config
        .strategy
        .s2_entry_breakout
        .max(config.strategy.atr_period)
        + 5
}

/// Check whether the latest bar crossed the prior System 2 entry levels.
pub fn scan_instrument(config: &TurtleConfig, bars: &[Bar]) -> Result<ScanRow, LiveError> {
    config.validate()?;
    let need = min_scan_bars(config);
    if bars.len() < need {
        return Err(LiveError::InsufficientHistory {
            have: bars.len(),
            need,
        });
    }

    let levels = compute_levels(config, bars)?;
    let last = bars.last().ok_or(LiveError::NoBars)?;
    let instrument = &config.instrument;

    Ok(ScanRow {
        symbol: instrument.symbol.clone(),
        exchange: instrument.exchange.clone(),
        currency: instrument.currency.clone(),
        asof_date: levels.asof_date,
        n: levels.n,
        last_open: last.open,
        last_high: last.high,
        last_low: last.low,
        last_close: last.close,
        long_triggered: levels.long_entry.is_some_and(|lvl| last.high >= lvl),
        short_triggered: levels.short_entry.is_some_and(|lvl| last.low <= lvl),
        long_entry: levels.long_entry,
        short_entry: levels.short_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccountConfig, Direction, StrategyConfig, System};
    use crate::domain::InstrumentConfig;
    use crate::indicators::make_ohlc_bars;

    fn config() -> TurtleConfig {
        TurtleConfig {
            account: AccountConfig {
                starting_equity: 50_000.0,
                risk_per_unit_pct: 0.01,
                max_units: 4,
                pyramid_add_every_n: 0.5,
                stop_loss_n: 2.0,
                commission_per_contract: 0.0,
                slippage_ticks: 0,
            },
            instrument: InstrumentConfig::new("CL", 1000.0, 0.01),
            strategy: StrategyConfig {
                atr_period: 3,
                system: System::S2,
                s1_entry_breakout: 3,
                s1_exit_breakout: 2,
                s2_entry_breakout: 4,
                s2_exit_breakout: 2,
                direction: Direction::Both,
                skip_winner_s1: false,
            },
        }
    }

    fn flat_bars(count: usize) -> Vec<(f64, f64, f64, f64)> {
        vec![(70.0, 71.0, 69.0, 70.0); count]
    }

    #[test]
    fn requires_minimum_history() {
        assert_eq!(min_scan_bars(&config()), 9);
        let bars = make_ohlc_bars(&flat_bars(8));
        let err = scan_instrument(&config(), &bars).unwrap_err();
        assert!(matches!(
            err,
            LiveError::InsufficientHistory { have: 8, need: 9 }
        ));
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut cfg = config();
        cfg.instrument.point_value = -1.0;
        let bars = make_ohlc_bars(&flat_bars(12));
        assert!(matches!(
            scan_instrument(&cfg, &bars).unwrap_err(),
            LiveError::Config(_)
        ));
    }

    #[test]
    fn flags_long_breakout_on_last_bar() {
        let mut data = flat_bars(9);
        data.push((70.0, 72.5, 69.5, 72.0));
        let row = scan_instrument(&config(), &make_ohlc_bars(&data)).unwrap();
        assert!((row.long_entry.unwrap() - 71.0).abs() < 1e-9);
        assert!(row.long_triggered);
        assert!(!row.short_triggered);
        assert!(row.is_triggered());
        assert_eq!(row.last_close, 72.0);
        assert_eq!(row.symbol, "CL");
        assert_eq!(row.exchange, "CME");
    }

    #[test]
    fn inside_bar_triggers_nothing() {
        let mut data = flat_bars(9);
        data.push((70.0, 70.5, 69.5, 70.2));
        let row = scan_instrument(&config(), &make_ohlc_bars(&data)).unwrap();
        assert!(!row.is_triggered());
    }
}
