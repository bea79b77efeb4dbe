//! Pure computation engines for position, charge and P&L derivation.

use crate::domain::Decimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod aggregate;
pub mod bucket;
pub mod charges;
pub mod compute;
pub mod summary;

pub use aggregate::{calendar_month, cumulative, pnl_buckets, CalendarDay, PnlBucket};
pub use bucket::{find_bucket, generate_buckets, Bucket, BucketPeriod};
pub use charges::{apply_charges, ChargeContext, ChargeEngine, FeeSchedule, FeeScheduleTable, TradeCharge};
pub use compute::{compute, trade_effects, ComputeOptions, ComputedPosition, PositionReducer, PositionState};
pub use summary::{summarize, SummaryStats};

/// The effect of one trade on its position, with running totals after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeEffect {
    pub trade_id: Uuid,
    pub position_id: Uuid,
    pub time: DateTime<Utc>,
    pub effect_type: EffectType,
    pub quantity: Decimal,
    /// Gross P&L realized by this trade alone.
    pub realized_pnl: Decimal,
    pub cumulative_gross_pnl: Decimal,
    pub cumulative_charges: Decimal,
    pub open_quantity: Decimal,
    pub average_price: Decimal,
}

impl TradeEffect {
    pub fn is_scale_out(&self) -> bool {
        self.effect_type == EffectType::ScaleOut
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectType {
    /// Increasing the open quantity.
    #[default]
    ScaleIn,
    /// Decreasing the open quantity; realizes P&L.
    ScaleOut,
}
