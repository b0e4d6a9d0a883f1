//! Synthetic daily bars for demos and tests.
//!
//! A regime-switching random walk: every 120 days the drift and volatility
//! are redrawn, which produces the occasional sustained trend a breakout
//! system needs to show anything. Deterministic per seed.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use turtle_core::domain::Bar;

const REGIME_DAYS: usize = 120;

/// Standard normal draw via Box-Muller.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // gen::<f64>() is in [0, 1); shift to (0, 1] so ln() stays finite.
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    mean + std * standard_normal(rng)
}

/// Generate `days` calendar days of bars starting at `start`, weekdays only.
pub fn generate_synthetic_bars(start: NaiveDate, days: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut closes = Vec::with_capacity(days);
    let mut price = 100.0_f64;
    let mut drift = 0.0002;
    let mut vol = 0.012;
    for i in 0..days {
        if i > 0 && i % REGIME_DAYS == 0 {
            drift = normal(&mut rng, 0.0002, 0.0008);
            vol = normal(&mut rng, 0.012, 0.006).abs();
        }
        let ret = drift + vol * standard_normal(&mut rng);
        price = (price * (1.0 + ret)).max(1.0);
        closes.push(price);
    }

    let mut bars = Vec::with_capacity(days);
    for (i, &close) in closes.iter().enumerate() {
        let open = if i == 0 { close } else { closes[i - 1] };
        let intraday = normal(&mut rng, 0.004, 0.002).abs().max(0.002);
        let volume = rng.gen_range(1000..5000) as f64;

        let date = start + Duration::days(i as i64);
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        bars.push(
            Bar::new(
                date,
                open,
                open.max(close) * (1.0 + intraday),
                open.min(close) * (1.0 - intraday),
                close,
            )
            .with_volume(volume),
        );
    }
    bars
}

/// Write bars as an OHLCV CSV string readable by `data_loader::parse_ohlcv_csv`.
pub fn bars_to_csv(bars: &[Bar]) -> Result<String, csv::Error> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "open", "high", "low", "close", "volume"])?;
    for b in bars {
        wtr.write_record([
            b.date.to_string(),
            format!("{:.6}", b.open),
            format!("{:.6}", b.high),
            format!("{:.6}", b.low),
            format!("{:.6}", b.close),
            b.volume.map(|v| format!("{v:.0}")).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}
