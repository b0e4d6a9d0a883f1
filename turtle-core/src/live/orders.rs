//! Next-session order plan.
//!
//! Flat: one entry stop per permitted side, each with a child protective
//! stop, the entries sharing a one-cancels-all group. In a position: a
//! protective stop for the full size plus an optional pyramid-add stop.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TurtleConfig;
use crate::domain::{round_to_tick, Side};

use super::levels::{compute_unit_qty, SignalLevels};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderAction {
    Buy,
    Sell,
}

impl OrderAction {
    /// Action that opens or adds to `side`.
    pub fn opening(side: Side) -> Self {
        match side {
            Side::Long => OrderAction::Buy,
            Side::Short => OrderAction::Sell,
        }
    }

    /// Action that closes `side`.
    pub fn closing(side: Side) -> Self {
        match side {
            Side::Long => OrderAction::Sell,
            Side::Short => OrderAction::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRole {
    EnterLong,
    EnterShort,
    ProtectiveStop,
    PyramidAdd,
}

/// A stop order to stage with the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOrder {
    pub role: OrderRole,
    pub action: OrderAction,
    pub qty: u64,
    pub stop_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oca_group: Option<String>,
    /// Child stop-loss attached to an entry, active once the entry fills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protective_stop: Option<f64>,
}

/// Broker-side position as seen by the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LivePosition {
    /// Signed contracts: positive long, negative short.
    pub qty: i64,
    pub units: u32,
    pub last_add_price: Option<f64>,
}

impl LivePosition {
    pub fn side(&self) -> Option<Side> {
        match self.qty {
            0 => None,
            q if q > 0 => Some(Side::Long),
            _ => Some(Side::Short),
        }
    }
}

/// Pyramid bookkeeping to write back after planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub units: u32,
    pub last_add_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    pub symbol: String,
    pub asof_date: NaiveDate,
    pub n: f64,
    pub equity: f64,
    pub qty_unit: u64,
    pub position_qty: i64,
    pub orders: Vec<PlannedOrder>,
    /// Why no orders were planned, when that is the case.
    pub skipped_reason: Option<String>,
    /// State to persist, or `None` to leave the stored state untouched.
    pub state: Option<PersistedState>,
}

/// One-cancels-all group shared by the entry stops of `symbol`.
pub fn entry_oca_group(symbol: &str) -> String {
    format!("TURTLE_{symbol}_ENTRY")
}

/// Plan the orders to stage for the next session.
pub fn plan_orders(
    config: &TurtleConfig,
    levels: &SignalLevels,
    equity: f64,
    position: LivePosition,
    last_close: f64,
) -> OrderPlan {
    let symbol = &config.instrument.symbol;
    let qty_unit = compute_unit_qty(config, equity, levels.n);

    let mut plan = OrderPlan {
        symbol: symbol.clone(),
        asof_date: levels.asof_date,
        n: levels.n,
        equity,
        qty_unit,
        position_qty: position.qty,
        orders: Vec::new(),
        skipped_reason: None,
        state: None,
    };

    if qty_unit == 0 {
        plan.skipped_reason = Some("unit quantity computed as 0".to_string());
        return plan;
    }

    match position.side() {
        None => plan_entries(config, levels, qty_unit, &mut plan),
        Some(side) => plan_management(config, levels, qty_unit, position, side, last_close, &mut plan),
    }

    debug!(
        symbol = %plan.symbol,
        orders = plan.orders.len(),
        skipped = plan.skipped_reason.is_some(),
        "order plan built"
    );
    plan
}

fn plan_entries(config: &TurtleConfig, levels: &SignalLevels, qty_unit: u64, plan: &mut OrderPlan) {
    let account = &config.account;
    let tick = config.instrument.tick_size;
    let oca = entry_oca_group(&config.instrument.symbol);

    let sides = [
        (Side::Long, OrderRole::EnterLong, levels.long_entry),
        (Side::Short, OrderRole::EnterShort, levels.short_entry),
    ];
    for (side, role, level) in sides {
        if !config.strategy.direction.permits(side) {
            continue;
        }
        let Some(entry) = level else {
            continue;
        };
        let stop = round_to_tick(entry - side.sign() * account.stop_loss_n * levels.n, tick);
        plan.orders.push(PlannedOrder {
            role,
            action: OrderAction::opening(side),
            qty: qty_unit,
            stop_price: entry,
            oca_group: Some(oca.clone()),
            protective_stop: Some(stop),
        });
    }

    if plan.orders.is_empty() {
        plan.skipped_reason = Some("no entry levels for the permitted sides".to_string());
        return;
    }
    plan.state = Some(PersistedState::default());
}

fn plan_management(
    config: &TurtleConfig,
    levels: &SignalLevels,
    qty_unit: u64,
    position: LivePosition,
    side: Side,
    last_close: f64,
    plan: &mut OrderPlan,
) {
    let account = &config.account;
    let tick = config.instrument.tick_size;

    // A position with no stored state counts as one unit of unknown price.
    let units = position.units.max(1);
    let last_add = position.last_add_price.unwrap_or(last_close);

    plan.orders.push(PlannedOrder {
        role: OrderRole::ProtectiveStop,
        action: OrderAction::closing(side),
        qty: position.qty.unsigned_abs(),
        stop_price: round_to_tick(last_add - side.sign() * account.stop_loss_n * levels.n, tick),
        oca_group: None,
        protective_stop: None,
    });

    if units < account.max_units {
        plan.orders.push(PlannedOrder {
            role: OrderRole::PyramidAdd,
            action: OrderAction::opening(side),
            qty: qty_unit,
            stop_price: round_to_tick(
                last_add + side.sign() * account.pyramid_add_every_n * levels.n,
                tick,
            ),
            oca_group: None,
            protective_stop: None,
        });
    }

    plan.state = Some(PersistedState {
        units,
        last_add_price: Some(last_add),
    });
}
