//! Trade type representing a single buy/sell execution.

use crate::domain::{Decimal, TradeKind};
use crate::error::ComputeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// An immutable execution record belonging to one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    /// Owning position.
    pub position_id: Uuid,
    pub kind: TradeKind,
    /// Execution time.
    pub time: DateTime<Utc>,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Broker charges for this trade, filled in by the charge engine or supplied manually.
    #[serde(default)]
    pub charges: Decimal,
    /// Broker-side execution id, used for de-duplication of imports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_trade_id: Option<String>,
}

impl Trade {
    pub fn new(
        position_id: Uuid,
        kind: TradeKind,
        time: DateTime<Utc>,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Trade {
            id: Uuid::new_v4(),
            position_id,
            kind,
            time,
            quantity,
            price,
            charges: Decimal::zero(),
            broker_trade_id: None,
        }
    }

    pub fn with_charges(mut self, charges: Decimal) -> Self {
        self.charges = charges;
        self
    }

    pub fn with_broker_trade_id(mut self, broker_trade_id: impl Into<String>) -> Self {
        self.broker_trade_id = Some(broker_trade_id.into());
        self
    }

    /// price * quantity
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }

    fn checked_notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.quantity)
    }

    /// Reject executions the reducer cannot interpret.
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !self.quantity.is_positive() {
            return Err(ComputeError::InvalidTrade {
                trade_id: self.id,
                reason: "quantity must be greater than zero".to_string(),
            });
        }
        if self.price.is_negative() {
            return Err(ComputeError::InvalidTrade {
                trade_id: self.id,
                reason: "price must not be negative".to_string(),
            });
        }
        if self.checked_notional().is_none() {
            return Err(ComputeError::InvalidTrade {
                trade_id: self.id,
                reason: "notional out of range".to_string(),
            });
        }
        Ok(())
    }

    /// Stable key identifying the same execution across imports.
    ///
    /// Priority: `broker_trade_id` (if present) > hash of the trade id and
    /// its execution fields. Distinct fills at the same instant, size and
    /// price keep distinct keys.
    pub fn dedup_key(&self) -> String {
        Self::compute_dedup_key(
            self.id,
            self.position_id,
            self.kind,
            self.time,
            &self.quantity,
            &self.price,
            self.broker_trade_id.as_deref(),
        )
    }

    pub fn compute_dedup_key(
        trade_id: Uuid,
        position_id: Uuid,
        kind: TradeKind,
        time: DateTime<Utc>,
        quantity: &Decimal,
        price: &Decimal,
        broker_trade_id: Option<&str>,
    ) -> String {
        if let Some(id) = broker_trade_id {
            return format!("broker:{}", id);
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(trade_id.as_bytes());
        hasher.update(position_id.as_bytes());
        hasher.update(if kind == TradeKind::Buy { b"B" } else { b"S" });
        hasher.update(time.timestamp_millis().to_le_bytes());
        hasher.update(quantity.to_canonical_string());
        hasher.update(price.to_canonical_string());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}

/// Drop repeated executions, keeping the first occurrence of each dedup key.
pub fn dedup_trades(trades: Vec<Trade>) -> Vec<Trade> {
    let mut seen = HashSet::new();
    trades
        .into_iter()
        .filter(|t| seen.insert(t.dedup_key()))
        .collect()
}
