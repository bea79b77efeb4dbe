//! Domain primitives: TradeKind, Direction, Status, Instrument, Exchange, DayKind, BrokerName.

use serde::{Deserialize, Serialize};

/// Side of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    /// Direction of a position opened by a trade of this kind.
    pub fn opening_direction(&self) -> Direction {
        match self {
            TradeKind::Buy => Direction::Long,
            TradeKind::Sell => Direction::Short,
        }
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "buy"),
            TradeKind::Sell => write!(f, "sell"),
        }
    }
}

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The trade kind that scales into a position of this direction.
    pub fn scale_in_kind(&self) -> TradeKind {
        match self {
            Direction::Long => TradeKind::Buy,
            Direction::Short => TradeKind::Sell,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Lifecycle status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Win,
    Loss,
    Breakeven,
}

impl Status {
    pub fn is_open(&self) -> bool {
        matches!(self, Status::Open)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Open => "open",
            Status::Win => "win",
            Status::Loss => "loss",
            Status::Breakeven => "breakeven",
        };
        write!(f, "{}", s)
    }
}

/// Instrument class of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Equity,
    Future,
    Option,
    Crypto,
}

/// Exchange an order was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Nse,
    Bse,
}

/// Tax/fee classification of traded quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    /// Offsets a lot opened on the same calendar day.
    Intraday,
    /// Held across a day boundary, or never offset.
    Delivery,
}

/// Broker identifier used for fee schedule lookups (e.g. "zerodha").
///
/// Normalized to lowercase so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BrokerName(String);

impl BrokerName {
    pub fn new(name: impl AsRef<str>) -> Self {
        BrokerName(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BrokerName {
    fn from(value: String) -> Self {
        BrokerName::new(value)
    }
}

impl From<BrokerName> for String {
    fn from(value: BrokerName) -> Self {
        value.0
    }
}

impl std::fmt::Display for BrokerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
