//! Performance metrics: pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! No dependencies on the runner, data loading, or engine state.

use serde::{Deserialize, Serialize};
use turtle_core::domain::{EquityPoint, Trade};

/// Summary block for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub starting_equity: f64,
    pub ending_equity: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_daily: f64,
    pub trades: usize,
    pub win_rate_pct: f64,
    /// `inf` when there are wins and no losses, written as `"inf"` in JSON.
    #[serde(with = "non_finite")]
    pub profit_factor: f64,
}

impl Summary {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade], starting_equity: f64) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let ending_equity = equity.last().copied().unwrap_or(starting_equity);
        Self {
            starting_equity,
            ending_equity,
            total_return_pct: (ending_equity / starting_equity - 1.0) * 100.0,
            max_drawdown_pct: max_drawdown(&equity) * 100.0,
            sharpe_daily: sharpe_daily(&equity),
            trades: trades.len(),
            win_rate_pct: win_rate(trades) * 100.0,
            profit_factor: profit_factor(trades),
        }
    }

    /// Human-readable multi-line block, as printed by the CLI.
    pub fn render(&self) -> String {
        [
            format!("  starting_equity: {:.2}", self.starting_equity),
            format!("  ending_equity: {:.2}", self.ending_equity),
            format!("  total_return_pct: {:.2}", self.total_return_pct),
            format!("  max_drawdown_pct: {:.2}", self.max_drawdown_pct),
            format!("  sharpe_daily: {:.3}", self.sharpe_daily),
            format!("  trades: {}", self.trades),
            format!("  win_rate_pct: {:.2}", self.win_rate_pct),
            format!("  profit_factor: {:.3}", self.profit_factor),
        ]
        .join("\n")
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Step returns with a zero first element: `r[0] = 0`, `r[i] = e[i]/e[i-1] - 1`.
///
/// A step from zero equity counts as 0.
pub fn step_returns(equity: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(equity.len());
    if equity.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(equity.windows(2).map(|w| {
        if w[0] != 0.0 {
            w[1] / w[0] - 1.0
        } else {
            0.0
        }
    }));
    out
}

/// Maximum drawdown as a non-positive fraction: `min(e / cummax(e) - 1)`.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min(eq / peak - 1.0);
        }
    }
    max_dd
}

/// Annualized Sharpe from daily step returns, population std, no risk-free rate.
///
/// Returns 0.0 when the std is zero.
pub fn sharpe_daily(equity: &[f64]) -> f64 {
    let returns = step_returns(equity);
    if returns.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = population_std(&returns, mean);
    if std <= 0.0 {
        return 0.0;
    }
    mean / std * 252.0_f64.sqrt()
}

/// Fraction of trades with positive after-cost P&L.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross after-cost wins over gross after-cost losses.
///
/// `inf` with wins and no losses; 0.0 with no wins.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_win: f64 = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl_after_costs)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| -t.pnl_after_costs)
        .sum();

    if gross_loss > 0.0 {
        gross_win / gross_loss
    } else if gross_win > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

/// JSON has no infinity: store non-finite floats as strings.
mod non_finite {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) => s
                .parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid float '{s}'"))),
        }
    }
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use turtle_core::domain::{ExitReason, Side};

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                date: base + chrono::Duration::days(i as i64),
                equity,
            })
            .collect()
    }

    fn trade(pnl_after_costs: f64) -> Trade {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        Trade {
            symbol: "ES".into(),
            entry_date: d,
            entry_price: 100.0,
            exit_date: d + chrono::Duration::days(3),
            exit_price: 101.0,
            side: Side::Long,
            qty: 1,
            units: 1,
            pnl: pnl_after_costs + 5.0,
            pnl_after_costs,
            reason: ExitReason::ChannelExit,
        }
    }

    #[test]
    fn step_returns_start_at_zero() {
        let r = step_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 3);
        assert_eq!(r[0], 0.0);
        assert!((r[1] - 0.1).abs() < 1e-12);
        assert!((r[2] - (-0.1)).abs() < 1e-12);
        assert!(step_returns(&[]).is_empty());
    }

    #[test]
    fn max_drawdown_from_running_peak() {
        assert_eq!(max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]), -0.25);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn sharpe_zero_for_flat_curve() {
        assert_eq!(sharpe_daily(&[100.0; 10]), 0.0);
        assert_eq!(sharpe_daily(&[]), 0.0);
    }

    #[test]
    fn sharpe_uses_population_std() {
        // returns [0, 0.1, 0] -> mean 1/30, population std = sqrt(2)/30
        let s = sharpe_daily(&[100.0, 110.0, 110.0]);
        let expected = (1.0 / 30.0) / (2.0_f64.sqrt() / 30.0) * 252.0_f64.sqrt();
        assert!((s - expected).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_edges() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[trade(10.0)]), f64::INFINITY);
        assert_eq!(profit_factor(&[trade(-10.0)]), 0.0);
        assert_eq!(profit_factor(&[trade(30.0), trade(-10.0), trade(-5.0)]), 2.0);
        // Break-even trades are neither wins nor losses.
        assert_eq!(profit_factor(&[trade(0.0)]), 0.0);
    }

    #[test]
    fn win_rate_counts_after_cost_winners() {
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(win_rate(&[trade(1.0), trade(-1.0), trade(0.0), trade(2.0)]), 0.5);
    }

    #[test]
    fn summary_block() {
        let eq = curve(&[100_000.0, 102_000.0, 99_000.0, 105_000.0]);
        let trades = vec![trade(6_000.0), trade(-1_000.0)];
        let s = Summary::compute(&eq, &trades, 100_000.0);
        assert_eq!(s.ending_equity, 105_000.0);
        assert!((s.total_return_pct - 5.0).abs() < 1e-9);
        assert!((s.max_drawdown_pct - (99.0 / 102.0 - 1.0) * 100.0).abs() < 1e-9);
        assert_eq!(s.trades, 2);
        assert_eq!(s.win_rate_pct, 50.0);
        assert_eq!(s.profit_factor, 6.0);
        assert!(s.sharpe_daily > 0.0);
        assert!(s.render().contains("trades: 2"));
    }

    #[test]
    fn infinite_profit_factor_survives_json() {
        let s = Summary::compute(&curve(&[100.0, 110.0]), &[trade(10.0)], 100.0);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"profit_factor\":\"inf\""));
        let back: Summary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.profit_factor, f64::INFINITY);
    }

    #[test]
    fn empty_curve_uses_starting_equity() {
        let s = Summary::compute(&[], &[], 50_000.0);
        assert_eq!(s.ending_equity, 50_000.0);
        assert_eq!(s.total_return_pct, 0.0);
        assert_eq!(s.max_drawdown_pct, 0.0);
        assert_eq!(s.sharpe_daily, 0.0);
    }
}
