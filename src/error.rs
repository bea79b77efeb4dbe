use crate::config::ConfigError;
use crate::domain::{Decimal, TradeKind};
use thiserror::Error;
use uuid::Uuid;

/// Failures of the position computations.
///
/// Every variant except `Internal` is caused by the trade list a user
/// submitted and carries a message that can be shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    #[error("{}", over_close_message(.kind))]
    OverClose {
        kind: TradeKind,
        open_quantity: Decimal,
        requested: Decimal,
    },
    #[error("a position needs at least one trade")]
    NoTrades,
    #[error("invalid trade {trade_id}: {reason}")]
    InvalidTrade { trade_id: Uuid, reason: String },
    #[error("position is already closed; trade {trade_id} cannot be applied")]
    PositionClosed { trade_id: Uuid },
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

fn over_close_message(kind: &TradeKind) -> &'static str {
    match kind {
        TradeKind::Sell => "you cannot sell more than you have open",
        TradeKind::Buy => "you cannot buy more than you have open",
    }
}

impl ComputeError {
    /// Whether the caller should surface this as a rejected request.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ComputeError::Internal(_))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<ComputeError> for AppError {
    fn from(err: ComputeError) -> Self {
        if err.is_user_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_close_messages_are_human_readable() {
        let err = ComputeError::OverClose {
            kind: TradeKind::Sell,
            open_quantity: Decimal::from(50),
            requested: Decimal::from(80),
        };
        assert_eq!(err.to_string(), "you cannot sell more than you have open");

        let err = ComputeError::OverClose {
            kind: TradeKind::Buy,
            open_quantity: Decimal::from(50),
            requested: Decimal::from(80),
        };
        assert_eq!(err.to_string(), "you cannot buy more than you have open");
    }

    #[test]
    fn test_user_errors_map_to_bad_request() {
        let app: AppError = ComputeError::NoTrades.into();
        assert!(matches!(app, AppError::BadRequest(_)));

        let app: AppError = ComputeError::Internal("boom".to_string()).into();
        assert!(matches!(app, AppError::Internal(_)));
    }
}
