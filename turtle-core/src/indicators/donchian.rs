//! Donchian Channel over the PRIOR `lookback` bars.
//!
//! - Upper: max(high[t-lookback..t])
//! - Lower: min(low[t-lookback..t])
//!
//! The current bar is excluded, so a bar's own extreme can never satisfy
//! its own breakout. Lookback: `lookback` (first defined value at index
//! `lookback`).

use super::{Indicator, IndicatorError};
use crate::domain::Bar;

/// Which band of the Donchian channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    lookback: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn new(lookback: usize, band: DonchianBand) -> Result<Self, IndicatorError> {
        if lookback == 0 {
            return Err(IndicatorError::InvalidPeriod {
                name: "Donchian",
                value: lookback,
            });
        }
        let name = match band {
            DonchianBand::Upper => format!("donchian_high_{lookback}"),
            DonchianBand::Lower => format!("donchian_low_{lookback}"),
        };
        Ok(Self {
            lookback,
            band,
            name,
        })
    }

    pub fn upper(lookback: usize) -> Result<Self, IndicatorError> {
        Self::new(lookback, DonchianBand::Upper)
    }

    pub fn lower(lookback: usize) -> Result<Self, IndicatorError> {
        Self::new(lookback, DonchianBand::Lower)
    }
}

/// Highest high of the prior `lookback` bars.
pub fn donchian_high(bars: &[Bar], lookback: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    Ok(Donchian::upper(lookback)?.compute(bars))
}

/// Lowest low of the prior `lookback` bars.
pub fn donchian_low(bars: &[Bar], lookback: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    Ok(Donchian::lower(lookback)?.compute(bars))
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut result = vec![None; n];

        for i in self.lookback..n {
            let window = &bars[i - self.lookback..i];
            result[i] = match self.band {
                DonchianBand::Upper => window.iter().map(|b| b.high).reduce(f64::max),
                DonchianBand::Lower => window.iter().map(|b| b.low).reduce(f64::min),
            };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    fn sample() -> Vec<Bar> {
        make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
            (13.5, 16.0, 12.0, 15.0),
            (15.0, 15.5, 14.0, 14.5),
        ])
    }

    #[test]
    fn donchian_high_3() {
        let result = donchian_high(&sample(), 3).unwrap();

        assert!(result[..3].iter().all(Option::is_none));
        // [3] = max(12, 15, 14) = 15 (bar 3's own 16 is excluded)
        assert_approx(result[3].unwrap(), 15.0, DEFAULT_EPSILON);
        // [4] = max(15, 14, 16) = 16
        assert_approx(result[4].unwrap(), 16.0, DEFAULT_EPSILON);
    }

    #[test]
    fn donchian_low_3() {
        let result = donchian_low(&sample(), 3).unwrap();

        assert!(result[..3].iter().all(Option::is_none));
        // [3] = min(9, 10, 13) = 9
        assert_approx(result[3].unwrap(), 9.0, DEFAULT_EPSILON);
        // [4] = min(10, 13, 12) = 10
        assert_approx(result[4].unwrap(), 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn current_bar_never_in_window() {
        let mut bars = sample();
        let before = donchian_high(&bars, 2).unwrap();
        bars[4].high = 1_000.0;
        bars[4].low = -1_000.0;
        assert_eq!(donchian_high(&bars, 2).unwrap()[4], before[4]);
        assert_eq!(
            donchian_low(&bars, 2).unwrap()[4],
            donchian_low(&sample(), 2).unwrap()[4]
        );
    }

    #[test]
    fn zero_lookback_is_error() {
        assert!(donchian_high(&sample(), 0).is_err());
        assert!(donchian_low(&sample(), 0).is_err());
    }

    #[test]
    fn lookback_longer_than_series_is_all_none() {
        assert!(donchian_high(&sample(), 10).unwrap().iter().all(Option::is_none));
    }

    #[test]
    fn donchian_lookback() {
        assert_eq!(Donchian::upper(20).unwrap().lookback(), 20);
        assert_eq!(Donchian::lower(1).unwrap().name(), "donchian_low_1");
    }
}
