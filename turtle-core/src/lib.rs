//! Turtle Core: domain types, indicators, sizing, the position state machine,
//! the backtest loop and live signal levels.
//!
//! This crate contains the heart of the breakout engine:
//! - Domain types (bars, instruments, positions, trades)
//! - ATR and Donchian channel indicators with no lookahead
//! - Volatility-based unit sizing
//! - Position state machine with stop, channel exit and pyramiding
//! - Bar-by-bar backtest loop with mark-to-market equity
//! - Next-session levels and order plans for live trading

pub mod config;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod live;
pub mod sizers;
