pub mod compile;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;

pub use compile::Compiler;
pub use config::{Config, ConfigError};
pub use domain::{
    BrokerName, DayKind, Decimal, Direction, Exchange, Instrument, Position, PositionInput, Status,
    Trade, TradeKind,
};
pub use engine::{BucketPeriod, ChargeEngine, FeeScheduleTable};
pub use error::{AppError, ComputeError};
