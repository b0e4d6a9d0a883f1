//! Pyramid bookkeeping persisted between live sessions.
//!
//! The broker reports position size but not how many units were added or at
//! what price. That lives in a JSON map keyed by symbol:
//! `{"ES": {"units": 2, "last_add_price": 5012.25}, ...}`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use turtle_core::live::{LivePosition, PersistedState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveState {
    pub symbol: String,
    pub units: u32,
    pub last_add_price: Option<f64>,
}

impl LiveState {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            units: 0,
            last_add_price: None,
        }
    }

    /// Combine with the broker's signed quantity for order planning.
    pub fn to_position(&self, qty: i64) -> LivePosition {
        LivePosition {
            qty,
            units: self.units,
            last_add_price: self.last_add_price,
        }
    }

    pub fn apply(&mut self, persisted: PersistedState) {
        self.units = persisted.units;
        self.last_add_price = persisted.last_add_price;
    }
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    units: Option<u32>,
    #[serde(default)]
    last_add_price: Option<f64>,
}

fn read_map(path: &Path) -> Option<Map<String, Value>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            warn!(path = %path.display(), "state file is not a JSON object, ignoring");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file is corrupt, ignoring");
            None
        }
    }
}

/// Load the state for `symbol`.
///
/// A missing, corrupt or malformed file yields a fresh state.
pub fn load_state(path: &Path, symbol: &str) -> LiveState {
    let entry = read_map(path)
        .and_then(|mut map| map.remove(symbol))
        .and_then(|v| serde_json::from_value::<Entry>(v).ok())
        .unwrap_or_default();
    LiveState {
        symbol: symbol.to_string(),
        units: entry.units.unwrap_or(0),
        last_add_price: entry.last_add_price,
    }
}

/// Merge `state` into the file at `path`, keeping other symbols' entries.
pub fn save_state(path: &Path, state: &LiveState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut map = read_map(path).unwrap_or_default();
    map.insert(
        state.symbol.clone(),
        serde_json::json!({
            "units": state.units,
            "last_add_price": state.last_add_price,
        }),
    );

    let json = serde_json::to_string_pretty(&Value::Object(map)).context("failed to serialize state")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
