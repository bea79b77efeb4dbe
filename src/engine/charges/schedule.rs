//! Broker fee schedules and per-split pricing.
//!
//! All rates are percentages (0.03 means 0.03%).

use crate::domain::{BrokerName, DayKind, Decimal, Exchange, Instrument, TradeKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("failed to read fee schedule file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fee schedule: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Charges levied on one (quantity, day kind) slice of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub brokerage: Decimal,
    /// Securities transaction tax.
    pub stt: Decimal,
    pub exchange_txn: Decimal,
    pub stamp_duty: Decimal,
    /// Regulator turnover fee.
    pub sebi: Decimal,
    pub gst: Decimal,
}

impl ChargeBreakdown {
    pub fn total(&self) -> Decimal {
        self.brokerage + self.stt + self.exchange_txn + self.stamp_duty + self.sebi + self.gst
    }
}

impl std::ops::Add for ChargeBreakdown {
    type Output = ChargeBreakdown;

    fn add(self, rhs: ChargeBreakdown) -> ChargeBreakdown {
        ChargeBreakdown {
            brokerage: self.brokerage + rhs.brokerage,
            stt: self.stt + rhs.stt,
            exchange_txn: self.exchange_txn + rhs.exchange_txn,
            stamp_duty: self.stamp_duty + rhs.stamp_duty,
            sebi: self.sebi + rhs.sebi,
            gst: self.gst + rhs.gst,
        }
    }
}

/// Fee schedule for one broker, instrument and day kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub brokerage_pct: Decimal,
    pub brokerage_min: Decimal,
    /// No cap when absent.
    pub brokerage_max: Option<Decimal>,
    pub stt_buy_pct: Decimal,
    pub stt_sell_pct: Decimal,
    pub exchange_txn_pct: BTreeMap<Exchange, Decimal>,
    /// Levied on buys only.
    pub stamp_duty_pct: Decimal,
    pub sebi_pct: Decimal,
    /// Applied to the brokerage component.
    pub gst_pct: Decimal,
}

impl FeeSchedule {
    /// A schedule that charges nothing.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Price `quantity` units traded at `price`.
    pub fn price(
        &self,
        kind: TradeKind,
        exchange: Exchange,
        quantity: Decimal,
        price: Decimal,
    ) -> ChargeBreakdown {
        let turnover = quantity * price;
        if !turnover.is_positive() {
            return ChargeBreakdown::default();
        }

        let mut brokerage = turnover.apply_pct(self.brokerage_pct).max(self.brokerage_min);
        if let Some(max) = self.brokerage_max {
            brokerage = brokerage.min(max);
        }

        let stt_pct = match kind {
            TradeKind::Buy => self.stt_buy_pct,
            TradeKind::Sell => self.stt_sell_pct,
        };
        let stamp_duty = match kind {
            TradeKind::Buy => turnover.apply_pct(self.stamp_duty_pct),
            TradeKind::Sell => Decimal::zero(),
        };
        let exchange_pct = self
            .exchange_txn_pct
            .get(&exchange)
            .copied()
            .unwrap_or_default();

        ChargeBreakdown {
            brokerage,
            stt: turnover.apply_pct(stt_pct),
            exchange_txn: turnover.apply_pct(exchange_pct),
            stamp_duty,
            sebi: turnover.apply_pct(self.sebi_pct),
            gst: brokerage.apply_pct(self.gst_pct),
        }
    }
}

/// One row of a [`FeeScheduleTable`] in its serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeScheduleEntry {
    pub broker: BrokerName,
    pub instrument: Instrument,
    pub day_kind: DayKind,
    pub schedule: FeeSchedule,
}

type ScheduleKey = (BrokerName, Instrument, DayKind);

/// Fee schedules keyed by (broker, instrument, day kind).
///
/// Serialized as a flat list of entries so it can live in a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<FeeScheduleEntry>", into = "Vec<FeeScheduleEntry>")]
pub struct FeeScheduleTable {
    schedules: HashMap<ScheduleKey, FeeSchedule>,
}

impl FeeScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        broker: BrokerName,
        instrument: Instrument,
        day_kind: DayKind,
        schedule: FeeSchedule,
    ) {
        self.schedules.insert((broker, instrument, day_kind), schedule);
    }

    pub fn lookup(
        &self,
        broker: &BrokerName,
        instrument: Instrument,
        day_kind: DayKind,
    ) -> Option<&FeeSchedule> {
        self.schedules.get(&(broker.clone(), instrument, day_kind))
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ScheduleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Equity schedules for the Indian discount brokers supported out of the box.
    pub fn builtin() -> Self {
        let mut table = Self::new();

        let exchange_txn: BTreeMap<Exchange, Decimal> = [
            (Exchange::Nse, dec("0.00297")),
            (Exchange::Bse, dec("0.00375")),
        ]
        .into_iter()
        .collect();

        let intraday = FeeSchedule {
            stt_sell_pct: dec("0.025"),
            exchange_txn_pct: exchange_txn.clone(),
            stamp_duty_pct: dec("0.003"),
            sebi_pct: dec("0.0001"),
            gst_pct: dec("18"),
            ..FeeSchedule::zero()
        };
        let delivery = FeeSchedule {
            stt_buy_pct: dec("0.1"),
            stt_sell_pct: dec("0.1"),
            exchange_txn_pct: exchange_txn,
            stamp_duty_pct: dec("0.015"),
            sebi_pct: dec("0.0001"),
            gst_pct: dec("18"),
            ..FeeSchedule::zero()
        };

        // 0.03% capped at 20 per order intraday, free delivery.
        let zerodha = BrokerName::new("zerodha");
        table.insert(
            zerodha.clone(),
            Instrument::Equity,
            DayKind::Intraday,
            FeeSchedule {
                brokerage_pct: dec("0.03"),
                brokerage_max: Some(dec("20")),
                ..intraday.clone()
            },
        );
        table.insert(zerodha, Instrument::Equity, DayKind::Delivery, delivery.clone());

        // 0.05% between 5 and 20 per order on both segments.
        let groww = BrokerName::new("groww");
        table.insert(
            groww.clone(),
            Instrument::Equity,
            DayKind::Intraday,
            FeeSchedule {
                brokerage_pct: dec("0.05"),
                brokerage_min: dec("5"),
                brokerage_max: Some(dec("20")),
                ..intraday
            },
        );
        table.insert(
            groww,
            Instrument::Equity,
            DayKind::Delivery,
            FeeSchedule {
                brokerage_pct: dec("0.05"),
                brokerage_min: dec("5"),
                brokerage_max: Some(dec("20")),
                ..delivery
            },
        );

        table
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap_or_default()
}

impl From<Vec<FeeScheduleEntry>> for FeeScheduleTable {
    fn from(entries: Vec<FeeScheduleEntry>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry.broker, entry.instrument, entry.day_kind, entry.schedule);
        }
        table
    }
}

impl From<FeeScheduleTable> for Vec<FeeScheduleEntry> {
    fn from(table: FeeScheduleTable) -> Self {
        let mut entries: Vec<FeeScheduleEntry> = table
            .schedules
            .into_iter()
            .map(|((broker, instrument, day_kind), schedule)| FeeScheduleEntry {
                broker,
                instrument,
                day_kind,
                schedule,
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.broker, a.instrument, a.day_kind).cmp(&(&b.broker, b.instrument, b.day_kind))
        });
        entries
    }
}
