//! Position: the derived, recomputable aggregate over one instrument's trades.

use crate::domain::{BrokerName, Decimal, Direction, Exchange, Instrument, Status, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied description of a position to (re)compute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInput {
    /// Every trade's `position_id` must match.
    pub id: Uuid,
    pub symbol: String,
    pub instrument: Instrument,
    pub broker: BrokerName,
    #[serde(default)]
    pub exchange: Exchange,
    /// Amount the user declared at risk; zero disables the R-factor.
    #[serde(default)]
    pub risk_amount: Decimal,
    /// Overrides the summed trade charges when present.
    #[serde(default)]
    pub manual_charges: Option<Decimal>,
    /// Last traded price, used for unrealized P&L of open positions.
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    /// Ordered by execution time.
    pub trades: Vec<Trade>,
}

/// A persisted position. Every derived field is a pure function of `trades`,
/// `risk_amount` and the charge inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub instrument: Instrument,
    pub broker: BrokerName,
    pub exchange: Exchange,
    pub direction: Direction,
    pub status: Status,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub risk_amount: Decimal,
    pub gross_pnl: Decimal,
    pub net_pnl: Decimal,
    pub charges: Decimal,
    pub r_factor: Decimal,
    pub return_pct: Decimal,
    pub charges_pct: Decimal,
    /// Non-zero only while `status` is open.
    pub open_quantity: Decimal,
    /// Non-zero only while `status` is open.
    pub open_average_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<Decimal>,
    pub trades: Vec<Trade>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_win(&self) -> bool {
        matches!(self.status, Status::Win | Status::Breakeven)
    }

    pub fn is_loss(&self) -> bool {
        matches!(self.status, Status::Loss)
    }
}
