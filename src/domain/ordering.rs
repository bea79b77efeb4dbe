//! Stable trade ordering for deterministic processing.

use crate::domain::Trade;
use chrono::{DateTime, Utc};

/// Stable ordering key for trades.
///
/// Ordering: time -> dedup key. Two executions at the same instant always
/// sort the same way regardless of input order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeOrderingKey {
    pub time: DateTime<Utc>,
    pub dedup_key: String,
}

impl TradeOrderingKey {
    pub fn from_trade(trade: &Trade) -> Self {
        TradeOrderingKey {
            time: trade.time,
            dedup_key: trade.dedup_key(),
        }
    }
}

/// Sort trades deterministically.
pub fn sort_trades_deterministic(trades: &mut [Trade]) {
    trades.sort_by_cached_key(TradeOrderingKey::from_trade);
}

/// True when execution times never decrease.
pub fn is_time_ordered(trades: &[Trade]) -> bool {
    trades.windows(2).all(|w| w[0].time <= w[1].time)
}
