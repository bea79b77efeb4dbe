//! Domain types and determinism layer for the trade journal.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TradeKind, Direction, Status, Instrument, Exchange, DayKind
//! - Trade and Position types with canonical JSON serialization
//! - Stable trade ordering and de-duplication helpers

pub mod decimal;
pub mod ordering;
pub mod position;
pub mod primitives;
pub mod trade;

pub use decimal::Decimal;
pub use ordering::{is_time_ordered, sort_trades_deterministic, TradeOrderingKey};
pub use position::{Position, PositionInput};
pub use primitives::{BrokerName, DayKind, Direction, Exchange, Instrument, Status, TradeKind};
pub use trade::{dedup_trades, Trade};
