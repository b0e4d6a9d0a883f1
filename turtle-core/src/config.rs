//! Account, instrument and strategy configuration.
//!
//! Configs load from JSON (`{account, instrument, strategy}`) or the same
//! layout in TOML. Every loader validates before returning, so a config that
//! reaches the engine always satisfies the invariants below.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{InstrumentConfig, Side};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config format '{0}' (expected .json or .toml)")]
    UnsupportedFormat(String),
}

/// Account-level risk and cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountConfig {
    pub starting_equity: f64,
    /// Fraction of equity risked per unit, e.g. 0.01 for 1%.
    pub risk_per_unit_pct: f64,
    pub max_units: u32,
    #[serde(alias = "pyramid_add_every_N")]
    pub pyramid_add_every_n: f64,
    #[serde(alias = "stop_loss_N")]
    pub stop_loss_n: f64,
    pub commission_per_contract: f64,
    /// Carried for config compatibility. Fills are not slipped.
    #[serde(default)]
    pub slippage_ticks: u32,
}

/// Breakout system selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum System {
    S1,
    S2,
}

/// Which sides the strategy may trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Both,
}

impl Direction {
    pub fn permits(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Direction::Both, _) | (Direction::Long, Side::Long) | (Direction::Short, Side::Short)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub atr_period: usize,
    pub system: System,
    pub s1_entry_breakout: usize,
    pub s1_exit_breakout: usize,
    pub s2_entry_breakout: usize,
    pub s2_exit_breakout: usize,
    pub direction: Direction,
    #[serde(default)]
    pub skip_winner_s1: bool,
}

impl StrategyConfig {
    /// Entry lookback of the active system.
    pub fn entry_lookback(&self) -> usize {
        match self.system {
            System::S1 => self.s1_entry_breakout,
            System::S2 => self.s2_entry_breakout,
        }
    }

    /// Exit lookback of the active system.
    pub fn exit_lookback(&self) -> usize {
        match self.system {
            System::S1 => self.s1_exit_breakout,
            System::S2 => self.s2_exit_breakout,
        }
    }

    /// The skip-winner filter only exists for System 1.
    pub fn skips_winners(&self) -> bool {
        self.skip_winner_s1 && self.system == System::S1
    }
}

impl Default for StrategyConfig {
    /// Classic parameters: 20-day ATR, S1 = 20/10, S2 = 55/20.
    fn default() -> Self {
        Self {
            atr_period: 20,
            system: System::S2,
            s1_entry_breakout: 20,
            s1_exit_breakout: 10,
            s2_entry_breakout: 55,
            s2_exit_breakout: 20,
            direction: Direction::Both,
            skip_winner_s1: false,
        }
    }
}

/// Complete configuration for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurtleConfig {
    pub account: AccountConfig,
    pub instrument: InstrumentConfig,
    pub strategy: StrategyConfig,
}

impl TurtleConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML config.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, choosing the parser from the extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let read = || {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })
        };
        match ext.as_str() {
            "json" => Self::from_json(&read()?),
            "toml" => Self::from_toml(&read()?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Check every numeric invariant. The first violation wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.account;
        let i = &self.instrument;
        let s = &self.strategy;

        positive("account.starting_equity", a.starting_equity)?;
        positive("account.risk_per_unit_pct", a.risk_per_unit_pct)?;
        positive("account.pyramid_add_every_n", a.pyramid_add_every_n)?;
        positive("account.stop_loss_n", a.stop_loss_n)?;
        if a.max_units < 1 {
            return Err(invalid("account.max_units", "must be >= 1"));
        }
        if !(a.commission_per_contract >= 0.0) {
            return Err(invalid("account.commission_per_contract", "must be >= 0"));
        }

        if i.symbol.trim().is_empty() {
            return Err(invalid("instrument.symbol", "must not be empty"));
        }
        positive("instrument.point_value", i.point_value)?;
        if !(i.tick_size >= 0.0) {
            return Err(invalid("instrument.tick_size", "must be >= 0"));
        }

        for (field, value) in [
            ("strategy.atr_period", s.atr_period),
            ("strategy.s1_entry_breakout", s.s1_entry_breakout),
            ("strategy.s1_exit_breakout", s.s1_exit_breakout),
            ("strategy.s2_entry_breakout", s.s2_entry_breakout),
            ("strategy.s2_exit_breakout", s.s2_exit_breakout),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be >= 1"));
            }
        }
        Ok(())
    }

    /// Deterministic BLAKE3 digest of the canonical JSON form.
    ///
    /// Two runs with identical configs share the same hash.
    pub fn config_hash(&self) -> String {
        // Serializing plain structs of numbers and strings cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be > 0 (got {value})"),
        })
    }
}
