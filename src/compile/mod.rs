//! Recompute pipeline turning a caller's trade list into a persisted-shape [`Position`].
//!
//! Charges are attributed and written onto the trades before the reducer
//! runs, because net P&L and every ratio depend on them.

use crate::config::{Config, ConfigError};
use crate::domain::{is_time_ordered, Position, PositionInput};
use crate::engine::{apply_charges, compute, ChargeContext, ChargeEngine, ComputeOptions};
use crate::error::ComputeError;
use uuid::Uuid;

pub struct Compiler {
    engine: ChargeEngine,
    auto_charges: bool,
}

impl Compiler {
    /// `auto_charges` controls whether trade charges are priced from the
    /// schedule table or taken as supplied.
    pub fn new(engine: ChargeEngine, auto_charges: bool) -> Self {
        Self {
            engine,
            auto_charges,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let schedules = config.load_fee_schedules()?;
        Ok(Self::new(
            ChargeEngine::new(schedules, config.exchange_timezone),
            config.auto_charges,
        ))
    }

    /// Fully recompute one position from its trades.
    ///
    /// # Errors
    /// Returns the first user input error found; nothing is partially computed.
    pub fn compile(&self, input: PositionInput) -> Result<Position, ComputeError> {
        let PositionInput {
            id,
            symbol,
            instrument,
            broker,
            exchange,
            risk_amount,
            manual_charges,
            mark_price,
            mut trades,
        } = input;

        if let Some(stray) = trades.iter().find(|t| t.position_id != id) {
            return Err(ComputeError::InvalidTrade {
                trade_id: stray.id,
                reason: format!("belongs to position {}", stray.position_id),
            });
        }
        if !is_time_ordered(&trades) {
            tracing::warn!(position_id = %id, "Trades are not in execution order; results are undefined");
        }

        if self.auto_charges && manual_charges.is_none() {
            let context = ChargeContext {
                broker: broker.clone(),
                instrument,
                exchange,
            };
            let charges = self.engine.attribute(&trades, &context)?;
            apply_charges(&mut trades, &charges)?;
        }

        let options = ComputeOptions {
            risk_amount,
            manual_charges,
            mark_price,
        };
        let computed = compute(&trades, &options)?;

        tracing::debug!(
            position_id = %id,
            status = %computed.status,
            net_pnl = %computed.net_pnl,
            "Position recomputed"
        );

        Ok(Position {
            id,
            symbol,
            instrument,
            broker,
            exchange,
            direction: computed.direction,
            status: computed.status,
            opened_at: computed.opened_at,
            closed_at: computed.closed_at,
            risk_amount,
            gross_pnl: computed.gross_pnl,
            net_pnl: computed.net_pnl,
            charges: computed.charges,
            r_factor: computed.r_factor,
            return_pct: computed.return_pct,
            charges_pct: computed.charges_pct,
            open_quantity: computed.open_quantity,
            open_average_price: computed.open_average_price,
            unrealized_pnl: computed.unrealized_pnl,
            trades,
        })
    }

    /// Compile many positions; failures are reported per position.
    pub fn compile_all(
        &self,
        inputs: Vec<PositionInput>,
    ) -> (Vec<Position>, Vec<(Uuid, ComputeError)>) {
        let mut positions = Vec::with_capacity(inputs.len());
        let mut failures = Vec::new();

        for input in inputs {
            let id = input.id;
            match self.compile(input) {
                Ok(position) => positions.push(position),
                Err(e) => {
                    tracing::warn!(position_id = %id, error = %e, "Position rejected");
                    failures.push((id, e));
                }
            }
        }

        (positions, failures)
    }
}
