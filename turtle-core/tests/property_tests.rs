//! Property tests for indicator, sizing and engine invariants.
//!
//! Uses proptest to verify:
//! 1. ATR seed and Wilder recursion
//! 2. Donchian at bar i is independent of bar i and later
//! 3. Unit size is monotone in equity and N
//! 4. At most one position at a time, one trade per close
//! 5. Identical inputs give identical outputs

use chrono::NaiveDate;
use proptest::prelude::*;
use turtle_core::config::{AccountConfig, Direction, StrategyConfig, System, TurtleConfig};
use turtle_core::domain::{Bar, InstrumentConfig};
use turtle_core::engine::run_backtest;
use turtle_core::indicators::{atr, donchian_high, donchian_low, true_range_series};
use turtle_core::sizers::calc_unit_qty;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random-walk bars from a list of (close change, upper wick, lower wick).
fn arb_bars(min: usize, max: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-3.0..3.0_f64, 0.0..2.0_f64, 0.0..2.0_f64), min..max).prop_map(
        |steps| {
            let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            let mut prev = 100.0_f64;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (chg, up, down))| {
                    let close = (prev + chg).max(5.0);
                    let open = prev;
                    let bar = Bar::new(
                        base + chrono::Duration::days(i as i64),
                        open,
                        open.max(close) + up,
                        open.min(close) - down,
                        close,
                    );
                    prev = close;
                    bar
                })
                .collect()
        },
    )
}

fn config(system: System, direction: Direction, max_units: u32) -> TurtleConfig {
    TurtleConfig {
        account: AccountConfig {
            starting_equity: 250_000.0,
            risk_per_unit_pct: 0.01,
            max_units,
            pyramid_add_every_n: 0.5,
            stop_loss_n: 2.0,
            commission_per_contract: 1.5,
            slippage_ticks: 0,
        },
        instrument: InstrumentConfig::new("PROP", 20.0, 0.25),
        strategy: StrategyConfig {
            atr_period: 10,
            system,
            s1_entry_breakout: 10,
            s1_exit_breakout: 5,
            s2_entry_breakout: 20,
            s2_exit_breakout: 10,
            direction,
            skip_winner_s1: true,
        },
    }
}

fn arb_config() -> impl Strategy<Value = TurtleConfig> {
    (
        prop_oneof![Just(System::S1), Just(System::S2)],
        prop_oneof![Just(Direction::Long), Just(Direction::Short), Just(Direction::Both)],
        1u32..5,
    )
        .prop_map(|(s, d, u)| config(s, d, u))
}

// ── 1. ATR ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn atr_seed_and_recursion(bars in arb_bars(5, 80), period in 1usize..15) {
        let series = atr(&bars, period).unwrap();
        let tr = true_range_series(&bars);
        prop_assert_eq!(series.len(), bars.len());

        for (i, v) in series.iter().enumerate() {
            if i + 1 < period {
                prop_assert!(v.is_none());
                continue;
            }
            let v = v.unwrap();
            if i + 1 == period {
                let seed = tr[..period].iter().sum::<f64>() / period as f64;
                prop_assert!((v - seed).abs() < 1e-9);
            } else {
                let prev = series[i - 1].unwrap();
                let expected = (prev * (period as f64 - 1.0) + tr[i]) / period as f64;
                prop_assert!((v - expected).abs() < 1e-9);
            }
        }
    }
}

// ── 2. Donchian ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn donchian_independent_of_current_and_future(
        bars in arb_bars(30, 80),
        lookback in 1usize..20,
        shock in 1.0..500.0_f64,
    ) {
        let i = bars.len() / 2;
        let hi = donchian_high(&bars, lookback).unwrap();
        let lo = donchian_low(&bars, lookback).unwrap();

        let mut shocked = bars.clone();
        for bar in shocked.iter_mut().skip(i) {
            bar.high += shock;
            bar.low -= shock;
        }
        prop_assert_eq!(donchian_high(&shocked, lookback).unwrap()[i], hi[i]);
        prop_assert_eq!(donchian_low(&shocked, lookback).unwrap()[i], lo[i]);

        if i >= lookback {
            let window = &bars[i - lookback..i];
            let max = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let min = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            prop_assert_eq!(hi[i], Some(max));
            prop_assert_eq!(lo[i], Some(min));
        } else {
            prop_assert!(hi[i].is_none());
        }
    }
}

// ── 3. Sizing ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn unit_qty_non_decreasing_in_equity(
        e1 in 0.0..1e7_f64,
        extra in 0.0..1e7_f64,
        n in 0.01..50.0_f64,
    ) {
        let a = calc_unit_qty(e1, 0.01, Some(n), 50.0, 2.0);
        let b = calc_unit_qty(e1 + extra, 0.01, Some(n), 50.0, 2.0);
        prop_assert!(a <= b);
    }

    #[test]
    fn unit_qty_non_increasing_in_n(
        equity in 1.0..1e7_f64,
        n1 in 0.01..50.0_f64,
        extra in 0.0..50.0_f64,
    ) {
        let a = calc_unit_qty(equity, 0.01, Some(n1), 50.0, 2.0);
        let b = calc_unit_qty(equity, 0.01, Some(n1 + extra), 50.0, 2.0);
        prop_assert!(a >= b);
    }

    #[test]
    fn unit_qty_zero_for_non_positive_inputs(v in -1e6..=0.0_f64) {
        prop_assert_eq!(calc_unit_qty(100_000.0, 0.01, Some(v), 50.0, 2.0), 0);
        prop_assert_eq!(calc_unit_qty(v, 0.01, Some(2.0), 50.0, 2.0), 0);
    }
}

// ── 4/5. Engine ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn trades_never_overlap(bars in arb_bars(40, 250), cfg in arb_config()) {
        let out = run_backtest(&cfg, &bars).unwrap();
        prop_assert_eq!(out.equity_curve.len(), bars.len());

        for t in &out.trades {
            prop_assert!(t.entry_date < t.exit_date);
            prop_assert!(t.units >= 1 && t.units <= cfg.account.max_units);
            prop_assert!(t.qty > 0);
        }
        // A position closes before the next one opens, never on the same bar.
        for pair in out.trades.windows(2) {
            prop_assert!(pair[0].exit_date < pair[1].entry_date);
        }
        if let (Some(pos), Some(last)) = (&out.open_position, out.trades.last()) {
            prop_assert!(last.exit_date < pos.entry_date);
        }

        let realized: f64 = out.trades.iter().map(|t| t.pnl_after_costs).sum();
        prop_assert!((out.realized_equity - (cfg.account.starting_equity + realized)).abs() < 1e-6);
    }

    #[test]
    fn runs_are_idempotent(bars in arb_bars(40, 200), cfg in arb_config()) {
        let a = run_backtest(&cfg, &bars).unwrap();
        let b = run_backtest(&cfg, &bars).unwrap();
        prop_assert_eq!(a, b);
    }
}
