//! Portfolio-level statistics over closed positions.

use crate::domain::{Decimal, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_positions: usize,
    pub open_positions: usize,
    pub closed_positions: usize,
    /// Win or breakeven.
    pub wins: usize,
    pub losses: usize,
    /// Percent of closed positions.
    pub win_rate: Decimal,
    pub loss_rate: Decimal,
    pub gross_pnl: Decimal,
    pub net_pnl: Decimal,
    pub charges: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub max_win: Decimal,
    pub max_loss: Decimal,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    /// Averaged over positions with a positive risk amount only.
    pub avg_r_factor: Decimal,
    /// Sum of wins over the magnitude of the sum of losses; zero without losses.
    pub profit_factor: Decimal,
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    sum: Decimal,
}

impl Accumulator {
    fn add(&mut self, value: Decimal) {
        self.count += 1;
        self.sum += value;
    }

    fn average(&self) -> Decimal {
        if self.count == 0 {
            return Decimal::zero();
        }
        self.sum / Decimal::from(self.count as i64)
    }
}

/// Summarize positions. Totals, rates and streaks cover closed positions,
/// taken in order of their closing time.
pub fn summarize(positions: &[Position]) -> SummaryStats {
    let mut closed: Vec<&Position> = positions.iter().filter(|p| !p.is_open()).collect();
    closed.sort_by_key(|p| p.closed_at);

    let mut stats = SummaryStats {
        total_positions: positions.len(),
        open_positions: positions.len() - closed.len(),
        closed_positions: closed.len(),
        ..SummaryStats::default()
    };

    let mut wins = Accumulator::default();
    let mut losses = Accumulator::default();
    let mut r_factors = Accumulator::default();
    let mut max_win: Option<Decimal> = None;
    let mut max_loss: Option<Decimal> = None;
    let mut win_streak = 0;
    let mut loss_streak = 0;

    for position in &closed {
        stats.gross_pnl += position.gross_pnl;
        stats.net_pnl += position.net_pnl;
        stats.charges += position.charges;

        if position.risk_amount.is_positive() {
            r_factors.add(position.r_factor);
        }

        if position.is_win() {
            wins.add(position.net_pnl);
            max_win = Some(max_win.map_or(position.net_pnl, |m| m.max(position.net_pnl)));
            win_streak += 1;
            loss_streak = 0;
        } else if position.is_loss() {
            losses.add(position.net_pnl);
            max_loss = Some(max_loss.map_or(position.net_pnl, |m| m.min(position.net_pnl)));
            loss_streak += 1;
            win_streak = 0;
        } else {
            win_streak = 0;
            loss_streak = 0;
        }

        stats.max_win_streak = stats.max_win_streak.max(win_streak);
        stats.max_loss_streak = stats.max_loss_streak.max(loss_streak);
    }

    let closed_count = Decimal::from(closed.len() as i64);
    stats.wins = wins.count;
    stats.losses = losses.count;
    stats.win_rate = Decimal::from(wins.count as i64).percent_of(closed_count).round_money();
    stats.loss_rate = Decimal::from(losses.count as i64).percent_of(closed_count).round_money();
    stats.avg_win = wins.average().round_money();
    stats.avg_loss = losses.average().round_money();
    stats.max_win = max_win.unwrap_or_default();
    stats.max_loss = max_loss.unwrap_or_default();
    stats.avg_r_factor = r_factors.average().round_money();
    stats.profit_factor = wins
        .sum
        .checked_div(losses.sum.abs())
        .unwrap_or_default()
        .round_money();
    stats.gross_pnl = stats.gross_pnl.round_money();
    stats.net_pnl = stats.net_pnl.round_money();
    stats.charges = stats.charges.round_money();

    stats
}
