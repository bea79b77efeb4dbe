//! Charge attribution: splits each trade into intraday/delivery quantity and
//! prices every slice against the broker's fee schedule.

pub mod schedule;
pub mod split;

pub use schedule::{ChargeBreakdown, FeeSchedule, FeeScheduleEntry, FeeScheduleTable, ScheduleError};
pub use split::{split_trades, ChargeSplit, SplitPart};

use crate::domain::{BrokerName, DayKind, Decimal, Exchange, Instrument, Trade};
use crate::error::ComputeError;
use chrono_tz::Tz;
use uuid::Uuid;

/// What a position trades and where, for schedule lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeContext {
    pub broker: BrokerName,
    pub instrument: Instrument,
    pub exchange: Exchange,
}

/// Charges attributed to one trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeCharge {
    pub trade_id: Uuid,
    pub breakdown: ChargeBreakdown,
    /// Sum of the breakdown, rounded to two places.
    pub amount: Decimal,
}

/// Prices trades with an injected schedule table.
///
/// Day boundaries are taken in the exchange timezone, independent of any
/// display timezone the caller uses elsewhere.
#[derive(Debug, Clone)]
pub struct ChargeEngine {
    schedules: FeeScheduleTable,
    exchange_tz: Tz,
}

impl ChargeEngine {
    pub fn new(schedules: FeeScheduleTable, exchange_tz: Tz) -> Self {
        Self {
            schedules,
            exchange_tz,
        }
    }

    fn schedule_for(&self, context: &ChargeContext, day_kind: DayKind) -> FeeSchedule {
        match self
            .schedules
            .lookup(&context.broker, context.instrument, day_kind)
        {
            Some(schedule) => schedule.clone(),
            None => {
                tracing::warn!(
                    broker = %context.broker,
                    instrument = ?context.instrument,
                    day_kind = ?day_kind,
                    "No fee schedule configured, charging zero"
                );
                FeeSchedule::zero()
            }
        }
    }

    /// Charges for each trade, aligned with the input order.
    ///
    /// Trades must be in execution order. Fails with the same over-close
    /// error as the reducer when a trade closes more than is open.
    pub fn attribute(
        &self,
        trades: &[Trade],
        context: &ChargeContext,
    ) -> Result<Vec<TradeCharge>, ComputeError> {
        let splits = split_trades(trades, self.exchange_tz)?;
        if splits.is_empty() {
            return Ok(Vec::new());
        }

        let intraday = self.schedule_for(context, DayKind::Intraday);
        let delivery = self.schedule_for(context, DayKind::Delivery);

        let charges = splits
            .iter()
            .map(|split| {
                let breakdown = split
                    .parts
                    .iter()
                    .map(|part| {
                        let schedule = match part.day_kind {
                            DayKind::Intraday => &intraday,
                            DayKind::Delivery => &delivery,
                        };
                        schedule.price(split.kind, context.exchange, part.quantity, split.price)
                    })
                    .fold(ChargeBreakdown::default(), |acc, b| acc + b);
                TradeCharge {
                    trade_id: split.trade_id,
                    amount: breakdown.total().round_money(),
                    breakdown,
                }
            })
            .collect();

        Ok(charges)
    }
}

/// Write attributed charges back onto their trades.
pub fn apply_charges(trades: &mut [Trade], charges: &[TradeCharge]) -> Result<(), ComputeError> {
    if trades.len() != charges.len() {
        return Err(ComputeError::Internal(format!(
            "{} charges for {} trades",
            charges.len(),
            trades.len()
        )));
    }
    for (trade, charge) in trades.iter_mut().zip(charges) {
        if trade.id != charge.trade_id {
            return Err(ComputeError::Internal(format!(
                "charge for trade {} applied to trade {}",
                charge.trade_id, trade.id
            )));
        }
        trade.charges = charge.amount;
    }
    Ok(())
}
