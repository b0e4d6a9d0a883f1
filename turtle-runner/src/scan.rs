//! Multi-instrument breakout scan.
//!
//! Each config names one instrument. Instruments are evaluated in parallel;
//! one that cannot be loaded or lacks history is logged and left out.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use turtle_core::config::TurtleConfig;
use turtle_core::live::{scan_instrument, ScanRow};

use crate::data_loader::BarSource;

/// Result of scanning a set of instruments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Every instrument that was evaluated, by symbol.
    pub signals: Vec<ScanRow>,
    /// Instruments whose last bar crossed an entry level. Long before short.
    pub triggered: Vec<ScanRow>,
}

impl ScanReport {
    /// One line per triggered instrument, or `(none)`.
    pub fn render_triggered(&self) -> String {
        if self.triggered.is_empty() {
            return "(none)".to_string();
        }
        self.triggered
            .iter()
            .map(|r| {
                let sides: Vec<&str> = [("LONG", r.long_triggered), ("SHORT", r.short_triggered)]
                    .into_iter()
                    .filter_map(|(s, ok)| ok.then_some(s))
                    .collect();
                let level = |v: Option<f64>| v.map_or_else(|| "NA".to_string(), |x| x.to_string());
                format!(
                    "{:>4} {:<10} asof={} close={} LE={} SE={}",
                    r.symbol,
                    sides.join("/"),
                    r.asof_date,
                    r.last_close,
                    level(r.long_entry),
                    level(r.short_entry)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Sorted `*.json` and `*.toml` files directly inside `dir`.
pub fn load_config_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        let is_config = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("toml")
        );
        if is_config && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every config in `dir`.
pub fn read_configs(dir: &Path) -> Result<Vec<TurtleConfig>> {
    load_config_dir(dir)?
        .iter()
        .map(|p| {
            TurtleConfig::from_file(p).with_context(|| format!("failed to load {}", p.display()))
        })
        .collect()
}

/// Scan all instruments, skipping those that fail to load or lack history.
pub fn scan_configs(configs: &[TurtleConfig], source: &dyn BarSource) -> ScanReport {
    let mut signals: Vec<ScanRow> = configs
        .par_iter()
        .filter_map(|config| {
            let symbol = &config.instrument.symbol;
            let bars = match source.daily_bars(&config.instrument) {
                Ok(bars) => bars,
                Err(e) => {
                    warn!(%symbol, error = %e, "skipping instrument: bars unavailable");
                    return None;
                }
            };
            match scan_instrument(config, &bars) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(%symbol, error = %e, "skipping instrument");
                    None
                }
            }
        })
        .collect();
    signals.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let mut triggered: Vec<ScanRow> = signals.iter().filter(|r| r.is_triggered()).cloned().collect();
    triggered.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then(b.long_triggered.cmp(&a.long_triggered))
            .then(b.short_triggered.cmp(&a.short_triggered))
    });

    info!(
        scanned = signals.len(),
        triggered = triggered.len(),
        "scan complete"
    );
    ScanReport { signals, triggered }
}
