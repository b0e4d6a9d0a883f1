//! A completed round trip, appended to the ledger once per closed position.

use super::position::Side;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Protective stop at `stop_loss_n * N` was touched.
    Stop,
    /// Price crossed the opposite exit channel.
    ChannelExit,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Stop => "stop",
            ExitReason::ChannelExit => "channel_exit",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    /// Quantity-weighted average entry across all pyramid units.
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub side: Side,
    pub qty: u64,
    pub units: u32,
    pub pnl: f64,
    pub pnl_after_costs: f64,
    pub reason: ExitReason,
}

impl Trade {
    pub fn costs(&self) -> f64 {
        self.pnl - self.pnl_after_costs
    }

    pub fn is_winner(&self) -> bool {
        self.pnl_after_costs > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl_after_costs < 0.0
    }
}
