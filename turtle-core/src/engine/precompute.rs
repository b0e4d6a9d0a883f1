//! Indicator precomputation for the active breakout system.
//!
//! All series are computed once before the bar loop and indexed per bar.

use crate::config::StrategyConfig;
use crate::domain::Bar;
use crate::indicators::{Atr, Donchian, Indicator, IndicatorError};

/// ATR plus the entry and exit Donchian bands, aligned with the bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct Channels {
    pub n: Vec<Option<f64>>,
    pub entry_high: Vec<Option<f64>>,
    pub entry_low: Vec<Option<f64>>,
    pub exit_high: Vec<Option<f64>>,
    pub exit_low: Vec<Option<f64>>,
    /// Bars before the first defined ATR value.
    pub warmup_bars: usize,
}

impl Channels {
    pub fn compute(bars: &[Bar], strategy: &StrategyConfig) -> Result<Self, IndicatorError> {
        let atr = Atr::new(strategy.atr_period)?;
        let entry_lb = strategy.entry_lookback();
        let exit_lb = strategy.exit_lookback();

        Ok(Self {
            n: atr.compute(bars),
            entry_high: Donchian::upper(entry_lb)?.compute(bars),
            entry_low: Donchian::lower(entry_lb)?.compute(bars),
            exit_high: Donchian::upper(exit_lb)?.compute(bars),
            exit_low: Donchian::lower(exit_lb)?.compute(bars),
            warmup_bars: atr.lookback(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::System;
    use crate::indicators::make_bars;

    #[test]
    fn selects_system_lookbacks() {
        let bars = make_bars(&(0..80).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let s1 = StrategyConfig {
            system: System::S1,
            ..StrategyConfig::default()
        };
        let ch = Channels::compute(&bars, &s1).unwrap();
        assert_eq!(ch.n.len(), 80);
        assert_eq!(ch.warmup_bars, 19);
        assert!(ch.entry_high[19].is_none());
        assert!(ch.entry_high[20].is_some());
        assert!(ch.exit_low[9].is_none());
        assert!(ch.exit_low[10].is_some());

        let s2 = StrategyConfig::default();
        let ch = Channels::compute(&bars, &s2).unwrap();
        assert!(ch.entry_high[54].is_none());
        assert!(ch.entry_high[55].is_some());
    }

    #[test]
    fn zero_period_propagates() {
        let s = StrategyConfig {
            atr_period: 0,
            ..StrategyConfig::default()
        };
        assert!(Channels::compute(&make_bars(&[1.0, 2.0]), &s).is_err());
    }
}
