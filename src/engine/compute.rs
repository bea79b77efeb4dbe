//! Position reducer: walks an ordered trade list and derives direction,
//! lifecycle status, average open price, realized P&L and derived ratios.

use crate::domain::{Decimal, Direction, Status, Trade};
use crate::error::ComputeError;
use chrono::{DateTime, Utc};

use super::{EffectType, TradeEffect};

/// Caller-supplied inputs that are not part of the trade list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputeOptions {
    /// Zero disables the R-factor.
    pub risk_amount: Decimal,
    /// Replaces the summed per-trade charges.
    pub manual_charges: Option<Decimal>,
    /// Enables unrealized P&L for open positions.
    pub mark_price: Option<Decimal>,
}

impl ComputeOptions {
    pub fn with_risk(risk_amount: Decimal) -> Self {
        Self {
            risk_amount,
            ..Self::default()
        }
    }
}

/// Derived fields of a position. Monetary values are rounded to two places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedPosition {
    pub direction: Direction,
    pub status: Status,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub gross_pnl: Decimal,
    pub net_pnl: Decimal,
    pub charges: Decimal,
    pub r_factor: Decimal,
    pub return_pct: Decimal,
    pub charges_pct: Decimal,
    pub open_quantity: Decimal,
    pub open_average_price: Decimal,
    pub unrealized_pnl: Option<Decimal>,
    /// Sum of price * quantity over every scale-in trade, unrounded.
    pub cost_basis: Decimal,
}

/// Running state of the reducer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionState {
    /// Set by the first trade.
    pub direction: Option<Direction>,
    pub open_quantity: Decimal,
    /// Only meaningful while `open_quantity` is non-zero.
    pub average_price: Decimal,
    /// Set once the open quantity returns to zero.
    pub closed_at: Option<DateTime<Utc>>,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        self.open_quantity.is_zero()
    }
}

pub struct PositionReducer {
    pub state: PositionState,
    opened_at: Option<DateTime<Utc>>,
    gross_pnl: Decimal,
    charges: Decimal,
    cost_basis: Decimal,
    effects: Vec<TradeEffect>,
}

impl PositionReducer {
    pub fn new() -> Self {
        Self {
            state: PositionState::default(),
            opened_at: None,
            gross_pnl: Decimal::zero(),
            charges: Decimal::zero(),
            cost_basis: Decimal::zero(),
            effects: Vec::new(),
        }
    }

    /// Apply one trade. Trades must arrive in execution order.
    ///
    /// On error the reducer must be discarded; no partial result is meaningful.
    pub fn process_trade(&mut self, trade: &Trade) -> Result<(), ComputeError> {
        trade.validate()?;

        if self.state.closed_at.is_some() {
            return Err(ComputeError::PositionClosed { trade_id: trade.id });
        }

        self.charges += trade.charges;

        match self.state.direction {
            None => self.handle_open(trade),
            Some(direction) if trade.kind == direction.scale_in_kind() => {
                self.handle_scale_in(trade)
            }
            Some(direction) => self.handle_scale_out(trade, direction),
        }
    }

    fn handle_open(&mut self, trade: &Trade) -> Result<(), ComputeError> {
        self.state.direction = Some(trade.kind.opening_direction());
        self.opened_at = Some(trade.time);
        self.handle_scale_in(trade)
    }

    fn handle_scale_in(&mut self, trade: &Trade) -> Result<(), ComputeError> {
        let out_of_range = || ComputeError::InvalidTrade {
            trade_id: trade.id,
            reason: "position value out of range".to_string(),
        };

        let old_qty = self.state.open_quantity;
        let new_qty = old_qty.checked_add(trade.quantity).ok_or_else(out_of_range)?;
        let new_value = (self.state.average_price * old_qty)
            .checked_add(trade.notional())
            .ok_or_else(out_of_range)?;
        let cost_basis = self
            .cost_basis
            .checked_add(trade.notional())
            .ok_or_else(out_of_range)?;

        self.state.average_price = new_value / new_qty;
        self.state.open_quantity = new_qty;
        self.cost_basis = cost_basis;

        self.push_effect(trade, EffectType::ScaleIn, Decimal::zero());
        Ok(())
    }

    fn handle_scale_out(&mut self, trade: &Trade, direction: Direction) -> Result<(), ComputeError> {
        let open_qty = self.state.open_quantity;
        if trade.quantity > open_qty {
            return Err(ComputeError::OverClose {
                kind: trade.kind,
                open_quantity: open_qty,
                requested: trade.quantity,
            });
        }

        let per_unit = match direction {
            Direction::Long => trade.price - self.state.average_price,
            Direction::Short => self.state.average_price - trade.price,
        };
        let realized = per_unit * trade.quantity;
        self.gross_pnl += realized;
        self.state.open_quantity = open_qty - trade.quantity;

        if self.state.is_flat() {
            self.state.average_price = Decimal::zero();
            self.state.closed_at = Some(trade.time);
        }

        self.push_effect(trade, EffectType::ScaleOut, realized);
        Ok(())
    }

    fn push_effect(&mut self, trade: &Trade, effect_type: EffectType, realized_pnl: Decimal) {
        self.effects.push(TradeEffect {
            trade_id: trade.id,
            position_id: trade.position_id,
            time: trade.time,
            effect_type,
            quantity: trade.quantity,
            realized_pnl,
            cumulative_gross_pnl: self.gross_pnl,
            cumulative_charges: self.charges,
            open_quantity: self.state.open_quantity,
            average_price: self.state.average_price,
        });
    }

    /// Derive the position fields from the trades processed so far.
    pub fn finish(&self, options: &ComputeOptions) -> Result<ComputedPosition, ComputeError> {
        let (direction, opened_at) = match (self.state.direction, self.opened_at) {
            (Some(direction), Some(opened_at)) => (direction, opened_at),
            _ => return Err(ComputeError::NoTrades),
        };

        let charges = options.manual_charges.unwrap_or(self.charges);
        let gross_pnl = self.gross_pnl;
        let net_pnl = gross_pnl - charges;

        // Classified on the stored precision so a sub-cent residue reads as breakeven.
        let settled = net_pnl.round_money();
        let status = if self.state.closed_at.is_none() {
            Status::Open
        } else if settled.is_positive() {
            Status::Win
        } else if settled.is_negative() {
            Status::Loss
        } else {
            Status::Breakeven
        };

        let r_factor = if options.risk_amount.is_positive() {
            net_pnl / options.risk_amount
        } else {
            Decimal::zero()
        };
        let charges_pct = if gross_pnl.is_positive() {
            charges.percent_of(gross_pnl)
        } else {
            Decimal::zero()
        };
        let return_pct = net_pnl.percent_of(self.cost_basis);

        let unrealized_pnl = match options.mark_price {
            Some(mark) if status.is_open() => {
                let per_unit = match direction {
                    Direction::Long => mark - self.state.average_price,
                    Direction::Short => self.state.average_price - mark,
                };
                Some((per_unit * self.state.open_quantity).round_money())
            }
            _ => None,
        };

        Ok(ComputedPosition {
            direction,
            status,
            opened_at,
            closed_at: self.state.closed_at,
            gross_pnl: gross_pnl.round_money(),
            net_pnl: net_pnl.round_money(),
            charges: charges.round_money(),
            r_factor: r_factor.round_money(),
            return_pct: return_pct.round_money(),
            charges_pct: charges_pct.round_money(),
            open_quantity: self.state.open_quantity,
            open_average_price: self.state.average_price.round_money(),
            unrealized_pnl,
            cost_basis: self.cost_basis,
        })
    }

    pub fn into_effects(self) -> Vec<TradeEffect> {
        self.effects
    }
}

impl Default for PositionReducer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce an ordered trade list to its derived position fields.
///
/// Trades are not re-sorted; callers pass them in execution order.
pub fn compute(trades: &[Trade], options: &ComputeOptions) -> Result<ComputedPosition, ComputeError> {
    if let [only] = trades {
        return single_trade(only, options);
    }

    let mut reducer = PositionReducer::new();
    for trade in trades {
        reducer.process_trade(trade)?;
    }
    reducer.finish(options)
}

/// A lone trade has nothing to realize: the position is open at the trade's price.
fn single_trade(trade: &Trade, options: &ComputeOptions) -> Result<ComputedPosition, ComputeError> {
    trade.validate()?;

    let charges = options.manual_charges.unwrap_or(trade.charges);
    let net_pnl = -charges;
    let direction = trade.kind.opening_direction();

    let r_factor = if options.risk_amount.is_positive() {
        net_pnl / options.risk_amount
    } else {
        Decimal::zero()
    };
    let unrealized_pnl = options.mark_price.map(|mark| {
        let per_unit = match direction {
            Direction::Long => mark - trade.price,
            Direction::Short => trade.price - mark,
        };
        (per_unit * trade.quantity).round_money()
    });

    Ok(ComputedPosition {
        direction,
        status: Status::Open,
        opened_at: trade.time,
        closed_at: None,
        gross_pnl: Decimal::zero(),
        net_pnl: net_pnl.round_money(),
        charges: charges.round_money(),
        r_factor: r_factor.round_money(),
        return_pct: net_pnl.percent_of(trade.notional()).round_money(),
        charges_pct: Decimal::zero(),
        open_quantity: trade.quantity,
        open_average_price: trade.price.round_money(),
        unrealized_pnl,
        cost_basis: trade.notional(),
    })
}

/// Per-trade effects of an ordered trade list.
pub fn trade_effects(trades: &[Trade]) -> Result<Vec<TradeEffect>, ComputeError> {
    let mut reducer = PositionReducer::new();
    for trade in trades {
        reducer.process_trade(trade)?;
    }
    Ok(reducer.into_effects())
}
