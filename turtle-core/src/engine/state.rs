//! Position/trade state machine for a single instrument.
//!
//! `TurtleState` owns the only `PositionState` for its instrument and
//! advances it one bar at a time. Per bar, while open:
//!
//! 1. Stop-loss (intraday risk control, highest priority)
//! 2. Channel exit
//! 3. Pyramid add (only if neither exit fired and units < max_units)
//!
//! While flat, breakout entries are evaluated for the sides the strategy's
//! direction permits, long first.

use chrono::NaiveDate;
use tracing::debug;

use crate::config::TurtleConfig;
use crate::domain::{round_to_tick, Bar, ExitReason, OpenPosition, PositionState, Side, Trade};
use crate::sizers::UnitSizer;

use super::precompute::Channels;

pub struct TurtleState<'a> {
    config: &'a TurtleConfig,
    sizer: UnitSizer,
    position: PositionState,
    /// Whether the last closed breakout in each direction was profitable
    /// after costs. Index 0 = long, 1 = short.
    last_breakout_won: [bool; 2],
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Long => 0,
        Side::Short => 1,
    }
}

impl<'a> TurtleState<'a> {
    pub fn new(config: &'a TurtleConfig) -> Self {
        Self {
            config,
            sizer: UnitSizer::new(&config.account, &config.instrument),
            position: PositionState::Flat,
            last_breakout_won: [false; 2],
        }
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    pub fn into_position(self) -> PositionState {
        self.position
    }

    pub fn last_breakout_was_winner(&self, side: Side) -> bool {
        self.last_breakout_won[side_index(side)]
    }

    /// Unrealized P&L of the open position at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.position
            .unrealized_pnl(price, self.config.instrument.point_value)
    }

    /// Advance the state machine over bar `i`.
    ///
    /// `equity` is realized equity, used to size new units. Returns the
    /// closed trade if the position went flat on this bar. Bars with an
    /// undefined `N` leave the state untouched.
    pub fn on_bar(
        &mut self,
        i: usize,
        bar: &Bar,
        channels: &Channels,
        equity: f64,
    ) -> Option<Trade> {
        let n = channels.n.get(i).copied().flatten()?;

        match std::mem::take(&mut self.position) {
            PositionState::Open(mut pos) => {
                if let Some((fill, reason)) = self.exit_fill(&pos, i, bar, channels) {
                    return Some(self.close(pos, bar.date, fill, reason));
                }
                self.try_pyramid(&mut pos, bar, n, equity);
                self.position = PositionState::Open(pos);
                None
            }
            PositionState::Flat => {
                self.position = self.try_enter(i, bar, channels, n, equity);
                None
            }
        }
    }

    /// Stop first, then the exit channel. Returns the rounded fill.
    fn exit_fill(
        &self,
        pos: &OpenPosition,
        i: usize,
        bar: &Bar,
        channels: &Channels,
    ) -> Option<(f64, ExitReason)> {
        let tick = self.config.instrument.tick_size;

        if pos.stop_touched(bar.high, bar.low) {
            return Some((round_to_tick(pos.stop_price, tick), ExitReason::Stop));
        }

        let level = match pos.side {
            Side::Long => channels.exit_low[i].filter(|&lvl| bar.low <= lvl),
            Side::Short => channels.exit_high[i].filter(|&lvl| bar.high >= lvl),
        };
        level.map(|lvl| (round_to_tick(lvl, tick), ExitReason::ChannelExit))
    }

    fn close(
        &mut self,
        pos: OpenPosition,
        exit_date: NaiveDate,
        fill: f64,
        reason: ExitReason,
    ) -> Trade {
        let account = &self.config.account;
        let pnl = pos.unrealized_pnl(fill, self.config.instrument.point_value);
        // Commission is charged on both the opening and the closing side.
        let costs = 2.0 * account.commission_per_contract * pos.qty as f64;
        let pnl_after_costs = pnl - costs;

        self.last_breakout_won[side_index(pos.side)] = pnl_after_costs > 0.0;

        debug!(
            symbol = %self.config.instrument.symbol,
            side = %pos.side,
            %reason,
            %exit_date,
            fill,
            qty = pos.qty,
            pnl_after_costs,
            "position closed"
        );

        Trade {
            symbol: self.config.instrument.symbol.clone(),
            entry_date: pos.entry_date,
            entry_price: pos.avg_price,
            exit_date,
            exit_price: fill,
            side: pos.side,
            qty: pos.qty,
            units: pos.units,
            pnl,
            pnl_after_costs,
            reason,
        }
    }

    fn try_pyramid(&self, pos: &mut OpenPosition, bar: &Bar, n: f64, equity: f64) {
        let account = &self.config.account;
        if pos.units >= account.max_units {
            return;
        }

        let trigger = pos.add_trigger(account.pyramid_add_every_n * n);
        let crossed = match pos.side {
            Side::Long => bar.high >= trigger,
            Side::Short => bar.low <= trigger,
        };
        if !crossed {
            return;
        }

        let qty_unit = self.sizer.unit_qty(equity, Some(n));
        if qty_unit == 0 {
            return;
        }

        let fill = round_to_tick(trigger, self.config.instrument.tick_size);
        let stop = OpenPosition::stop_from(pos.side, fill, account.stop_loss_n * n);
        pos.add_unit(fill, qty_unit, stop);

        debug!(
            symbol = %self.config.instrument.symbol,
            side = %pos.side,
            date = %bar.date,
            fill,
            qty_unit,
            units = pos.units,
            stop = pos.stop_price,
            "pyramid add"
        );
    }

    fn try_enter(
        &self,
        i: usize,
        bar: &Bar,
        channels: &Channels,
        n: f64,
        equity: f64,
    ) -> PositionState {
        let strategy = &self.config.strategy;

        let qty_unit = self.sizer.unit_qty(equity, Some(n));
        if qty_unit == 0 {
            return PositionState::Flat;
        }

        let long_level = channels.entry_high[i].filter(|&lvl| bar.high >= lvl);
        let short_level = channels.entry_low[i].filter(|&lvl| bar.low <= lvl);

        let candidates = [(Side::Long, long_level), (Side::Short, short_level)];
        for (side, level) in candidates {
            if !strategy.direction.permits(side) {
                continue;
            }
            let Some(level) = level else {
                continue;
            };
            // A triggered breakout consumes the bar, even when skipped.
            if strategy.skips_winners() && self.last_breakout_was_winner(side) {
                debug!(
                    symbol = %self.config.instrument.symbol,
                    %side,
                    date = %bar.date,
                    "breakout skipped: last breakout in this direction was a winner"
                );
                return PositionState::Flat;
            }
            return PositionState::Open(self.open(side, level, bar.date, qty_unit, n));
        }

        PositionState::Flat
    }

    fn open(&self, side: Side, level: f64, date: NaiveDate, qty: u64, n: f64) -> OpenPosition {
        let entry = round_to_tick(level, self.config.instrument.tick_size);
        let stop = OpenPosition::stop_from(side, entry, self.config.account.stop_loss_n * n);

        debug!(
            symbol = %self.config.instrument.symbol,
            %side,
            %date,
            entry,
            qty,
            stop,
            n,
            "position opened"
        );

        OpenPosition {
            entry_date: date,
            side,
            qty,
            avg_price: entry,
            last_add_price: entry,
            stop_price: stop,
            units: 1,
        }
    }
}
