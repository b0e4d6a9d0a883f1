//! Position sizing: how many contracts make up one unit.
//!
//! Sizers are equity-aware but signal-agnostic: they never decide whether to
//! enter, only how large a unit is when the state machine does.

pub mod atr_risk;

pub use crate::domain::instrument::round_to_tick;
pub use atr_risk::{calc_unit_qty, UnitSizer};
