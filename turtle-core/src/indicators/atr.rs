//! Average True Range (ATR), the volatility unit `N`.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! The first bar has no previous close, so its TR is high-low.
//! Seed: ATR[period-1] = mean(TR[0..period]).
//! Then Wilder smoothing: ATR[t] = (ATR[t-1]*(period-1) + TR[t]) / period.

use super::{Indicator, IndicatorError};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod {
                name: "ATR",
                value: period,
            });
        }
        Ok(Self {
            period,
            name: format!("atr_{period}"),
        })
    }
}

/// True range of a bar given the previous session's close.
pub fn true_range(prev_close: f64, high: f64, low: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// True Range series aligned with `bars`.
pub fn true_range_series(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            tr.push(bar.high - bar.low);
        } else {
            tr.push(true_range(bars[i - 1].close, bar.high, bar.low));
        }
    }
    tr
}

/// ATR series, `None` for indices before `period - 1`.
pub fn atr(bars: &[Bar], period: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    Ok(Atr::new(period)?.compute(bars))
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut result = vec![None; n];
        if n < self.period {
            return result;
        }

        let tr = true_range_series(bars);
        let period = self.period as f64;

        let seed = tr[..self.period].iter().sum::<f64>() / period;
        result[self.period - 1] = Some(seed);

        let mut prev = seed;
        for i in self.period..n {
            prev = (prev * (period - 1.0) + tr[i]) / period;
            result[i] = Some(prev);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 105-95 = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range_series(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        // Gap up: prev close 100, current bar 108-115
        assert_approx(true_range(100.0, 115.0, 108.0), 15.0, DEFAULT_EPSILON);
        // Gap down: prev close 100, current bar 85-90
        assert_approx(true_range(100.0, 90.0, 85.0), 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let result = atr(&bars, 3).unwrap();

        assert!(result[0].is_none());
        assert!(result[1].is_none());
        // Seed includes TR[0] = high-low: mean(10, 8, 9) = 9
        assert_approx(result[2].unwrap(), 9.0, DEFAULT_EPSILON);
        // ATR[3] = (9*2 + 6) / 3 = 8
        assert_approx(result[3].unwrap(), 8.0, DEFAULT_EPSILON);
        // ATR[4] = (8*2 + 6) / 3 = 22/3
        assert_approx(result[4].unwrap(), 22.0 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_insufficient_bars_all_none() {
        let bars = make_ohlc_bars(&[(1.0, 2.0, 0.5, 1.5), (1.5, 2.5, 1.0, 2.0)]);
        assert!(atr(&bars, 3).unwrap().iter().all(Option::is_none));
        assert!(atr(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn atr_zero_period_is_error() {
        let bars = make_ohlc_bars(&[(1.0, 2.0, 0.5, 1.5)]);
        assert_eq!(
            atr(&bars, 0).unwrap_err(),
            IndicatorError::InvalidPeriod {
                name: "ATR",
                value: 0
            }
        );
    }

    #[test]
    fn atr_period_1_equals_true_range() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
        ]);
        let result = atr(&bars, 1).unwrap();
        assert_approx(result[0].unwrap(), 10.0, DEFAULT_EPSILON);
        assert_approx(result[1].unwrap(), 8.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(20).unwrap().lookback(), 19);
        assert_eq!(Atr::new(20).unwrap().name(), "atr_20");
    }
}
