use serde::{Deserialize, Serialize};

/// Which series the signal layer reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalContract {
    /// Back-adjusted continuous futures history.
    #[default]
    Continuous,
}

/// Which contract the order layer trades.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContract {
    #[default]
    FrontMonth,
}

/// Futures instrument metadata.
///
/// `point_value` converts one unit of price movement into currency P&L per
/// contract. The contract-selection fields are only read by broker adapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub point_value: f64,
    pub tick_size: f64,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub signal_contract: SignalContract,
    #[serde(default)]
    pub execution_contract: ExecutionContract,
    #[serde(default = "default_roll_days")]
    pub roll_days_before_expiry: u32,
    #[serde(default = "default_min_days")]
    pub min_days_to_expiry: u32,
}

fn default_exchange() -> String {
    "CME".into()
}

fn default_currency() -> String {
    "USD".into()
}

fn default_roll_days() -> u32 {
    7
}

fn default_min_days() -> u32 {
    10
}

impl InstrumentConfig {
    /// Instrument with default exchange, currency and contract selection.
    pub fn new(symbol: impl Into<String>, point_value: f64, tick_size: f64) -> Self {
        Self {
            symbol: symbol.into(),
            point_value,
            tick_size,
            exchange: default_exchange(),
            currency: default_currency(),
            signal_contract: SignalContract::default(),
            execution_contract: ExecutionContract::default(),
            roll_days_before_expiry: default_roll_days(),
            min_days_to_expiry: default_min_days(),
        }
    }

    /// Round a price to this instrument's tick.
    pub fn round_price(&self, price: f64) -> f64 {
        round_to_tick(price, self.tick_size)
    }
}

/// Round `price` to the nearest multiple of `tick_size`.
///
/// A non-positive tick size leaves the price untouched.
pub fn round_to_tick(price: f64, tick_size: f64) -> f64 {
    if tick_size <= 0.0 {
        return price;
    }
    (price / tick_size).round() * tick_size
}
