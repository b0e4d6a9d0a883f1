//! ATR risk sizing: contracts per unit from volatility-normalized risk.
//!
//! The currency loss if a unit is stopped out `stop_loss_n * N` away is held
//! at `risk_per_unit_pct` of equity, whatever the instrument's price level.

use crate::config::AccountConfig;
use crate::domain::InstrumentConfig;

/// Contracts per unit.
///
/// # Formula
/// ```text
/// dollar_risk        = equity * risk_per_unit_pct
/// per_contract_risk  = stop_loss_n * N * point_value
/// qty                = floor(dollar_risk / per_contract_risk)
/// ```
///
/// Returns 0 whenever an input is non-positive, non-finite, or `N` is
/// undefined. Zero means "nothing sizeable right now", not a fault.
///
/// # Example
/// ```
/// use turtle_core::sizers::calc_unit_qty;
///
/// // $100k, 1% risk, N = 10, $50/pt, 2N stop -> 1000 / 1000 = 1 contract
/// assert_eq!(calc_unit_qty(100_000.0, 0.01, Some(10.0), 50.0, 2.0), 1);
/// assert_eq!(calc_unit_qty(100_000.0, 0.01, None, 50.0, 2.0), 0);
/// ```
pub fn calc_unit_qty(
    equity: f64,
    risk_per_unit_pct: f64,
    n: Option<f64>,
    point_value: f64,
    stop_loss_n: f64,
) -> u64 {
    let Some(n) = n else {
        return 0;
    };
    let usable = |v: f64| v > 0.0 && v.is_finite();
    if !(usable(equity)
        && usable(risk_per_unit_pct)
        && usable(n)
        && usable(point_value)
        && usable(stop_loss_n))
    {
        return 0;
    }

    let dollar_risk = equity * risk_per_unit_pct;
    let per_contract_risk = stop_loss_n * n * point_value;
    let qty = (dollar_risk / per_contract_risk).floor();
    if qty.is_finite() && qty > 0.0 {
        qty as u64
    } else {
        0
    }
}

/// Unit sizer bound to one account and instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSizer {
    risk_per_unit_pct: f64,
    point_value: f64,
    stop_loss_n: f64,
}

impl UnitSizer {
    pub fn new(account: &AccountConfig, instrument: &InstrumentConfig) -> Self {
        Self {
            risk_per_unit_pct: account.risk_per_unit_pct,
            point_value: instrument.point_value,
            stop_loss_n: account.stop_loss_n,
        }
    }

    /// Contracts per unit at the given equity and `N`.
    pub fn unit_qty(&self, equity: f64, n: Option<f64>) -> u64 {
        calc_unit_qty(
            equity,
            self.risk_per_unit_pct,
            n,
            self.point_value,
            self.stop_loss_n,
        )
    }
}
