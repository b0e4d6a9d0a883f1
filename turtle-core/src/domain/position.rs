use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a position or breakout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short. Multiplies a favorable price move.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open position of 1..=max_units pyramid units in a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub side: Side,
    pub qty: u64,
    /// Quantity-weighted average of all fills.
    pub avg_price: f64,
    pub last_add_price: f64,
    pub stop_price: f64,
    pub units: u32,
}

impl OpenPosition {
    /// Unrealized P&L in currency at `price`.
    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        self.side.sign() * (price - self.avg_price) * self.qty as f64 * point_value
    }

    /// Stop level `stop_distance` away from `fill` on the losing side.
    pub fn stop_from(side: Side, fill: f64, stop_distance: f64) -> f64 {
        fill - side.sign() * stop_distance
    }

    /// True if the bar's range reaches the protective stop.
    pub fn stop_touched(&self, high: f64, low: f64) -> bool {
        match self.side {
            Side::Long => low <= self.stop_price,
            Side::Short => high >= self.stop_price,
        }
    }

    /// Next pyramid trigger, `add_distance` beyond the last fill in the favorable direction.
    pub fn add_trigger(&self, add_distance: f64) -> f64 {
        self.last_add_price + self.side.sign() * add_distance
    }

    /// Fold a pyramid fill into the position.
    ///
    /// The whole position's stop moves to `new_stop`, which is measured
    /// from the latest fill with the current N.
    pub fn add_unit(&mut self, fill: f64, qty: u64, new_stop: f64) {
        let new_qty = self.qty + qty;
        self.avg_price =
            (self.avg_price * self.qty as f64 + fill * qty as f64) / new_qty as f64;
        self.qty = new_qty;
        self.units += 1;
        self.last_add_price = fill;
        self.stop_price = new_stop;
    }
}

/// Position state for one instrument: nothing held, or exactly one open position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn as_open(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Open(p) => Some(p),
            PositionState::Flat => None,
        }
    }

    /// Unrealized P&L of the open position at `price`, zero when flat.
    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        self.as_open()
            .map_or(0.0, |p| p.unrealized_pnl(price, point_value))
    }
}
