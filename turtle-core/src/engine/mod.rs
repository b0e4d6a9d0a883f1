//! Backtesting engine: precomputed channels, the position state machine and
//! the bar-by-bar loop that drives it.

pub mod loop_runner;
pub mod precompute;
pub mod state;

pub use loop_runner::{run_backtest, BacktestOutput};
pub use precompute::Channels;
pub use state::TurtleState;

use thiserror::Error;

use crate::config::ConfigError;
use crate::indicators::IndicatorError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("indicator error: {0}")]
    Indicator(#[from] IndicatorError),
}
