//! Domain types for the turtle engine.

pub mod bar;
pub mod instrument;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use instrument::{round_to_tick, ExecutionContract, InstrumentConfig, SignalContract};
pub use position::{OpenPosition, PositionState, Side};
pub use trade::{ExitReason, Trade};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the equity curve, marked to market at the bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}
