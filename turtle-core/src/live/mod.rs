//! Live signal support: next-session levels, order plans and scan rows.
//!
//! Signals are computed on completed daily bars only. Everything here is pure:
//! broker connectivity, account queries and order transmission live outside
//! this crate.

pub mod levels;
pub mod orders;
pub mod scan;

pub use levels::{compute_levels, compute_unit_qty, SignalLevels};
pub use orders::{
    entry_oca_group, plan_orders, LivePosition, OrderAction, OrderPlan, OrderRole, PersistedState,
    PlannedOrder,
};
pub use scan::{min_scan_bars, scan_instrument, ScanRow};

use thiserror::Error;

use crate::config::{ConfigError, System};
use crate::indicators::IndicatorError;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("no bars")]
    NoBars,

    #[error("live levels support System 2 only (got {0:?})")]
    UnsupportedSystem(System),

    #[error("not enough history: have {have} bars, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("indicator error: {0}")]
    Indicator(#[from] IndicatorError),
}
