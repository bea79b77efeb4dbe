//! Intraday/delivery classification of traded quantity.

use crate::domain::{Decimal, DayKind, Trade, TradeKind};
use crate::error::ComputeError;
use chrono::NaiveDate;
use chrono_tz::Tz;
use uuid::Uuid;

/// A slice of one trade's quantity with its day kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPart {
    pub quantity: Decimal,
    pub day_kind: DayKind,
}

/// Per-trade classification produced while pricing charges. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeSplit {
    pub trade_id: Uuid,
    pub kind: TradeKind,
    pub price: Decimal,
    /// Non-empty; quantities sum to the trade quantity.
    pub parts: Vec<SplitPart>,
}

impl ChargeSplit {
    fn from_quantities(trade: &Trade, intraday: Decimal, delivery: Decimal) -> Self {
        let parts = [(intraday, DayKind::Intraday), (delivery, DayKind::Delivery)]
            .into_iter()
            .filter(|(qty, _)| qty.is_positive())
            .map(|(quantity, day_kind)| SplitPart { quantity, day_kind })
            .collect();
        ChargeSplit {
            trade_id: trade.id,
            kind: trade.kind,
            price: trade.price,
            parts,
        }
    }

    pub fn quantity(&self, day_kind: DayKind) -> Decimal {
        self.parts
            .iter()
            .filter(|p| p.day_kind == day_kind)
            .map(|p| p.quantity)
            .sum()
    }

    pub fn total_quantity(&self) -> Decimal {
        self.parts.iter().map(|p| p.quantity).sum()
    }
}

/// A quantity opened on the position's home side, still available for
/// same-day netting.
#[derive(Debug, Clone, Copy)]
struct Lot {
    trade_index: usize,
    remaining: Decimal,
}

/// Classify every trade's quantity as intraday or delivery.
///
/// The first trade fixes the home side. Each opposite-side trade nets against
/// home-side lots opened on the same calendar day in `tz`, most recent lot
/// first; whatever it cannot net is delivery. Home-side quantity never netted
/// the same day is delivery.
///
/// Only lots from the current day are kept on the matching stack, so once a
/// lot from an earlier day would be next in line, matching stops.
pub fn split_trades(trades: &[Trade], tz: Tz) -> Result<Vec<ChargeSplit>, ComputeError> {
    let Some(first) = trades.first() else {
        return Ok(Vec::new());
    };
    let home = first.kind;

    let mut lots: Vec<Lot> = Vec::new();
    let mut same_day: Vec<usize> = Vec::new();
    let mut stack_day: Option<NaiveDate> = None;
    let mut open_quantity = Decimal::zero();
    // Intraday quantity of each opposite-side trade, by trade index.
    let mut netted = vec![Decimal::zero(); trades.len()];

    for (index, trade) in trades.iter().enumerate() {
        trade.validate()?;

        let day = trade.time.with_timezone(&tz).date_naive();
        if stack_day != Some(day) {
            same_day.clear();
            stack_day = Some(day);
        }

        if trade.kind == home {
            same_day.push(lots.len());
            lots.push(Lot {
                trade_index: index,
                remaining: trade.quantity,
            });
            open_quantity += trade.quantity;
            continue;
        }

        if trade.quantity > open_quantity {
            return Err(ComputeError::OverClose {
                kind: trade.kind,
                open_quantity,
                requested: trade.quantity,
            });
        }
        open_quantity -= trade.quantity;

        let mut remaining = trade.quantity;
        while remaining.is_positive() {
            let Some(&lot_index) = same_day.last() else {
                break;
            };
            let lot = &mut lots[lot_index];
            let take = remaining.min(lot.remaining);
            lot.remaining -= take;
            remaining -= take;
            netted[index] += take;
            if lot.remaining.is_zero() {
                same_day.pop();
            }
        }
    }

    let mut lot_remaining = vec![None; trades.len()];
    for lot in &lots {
        lot_remaining[lot.trade_index] = Some(lot.remaining);
    }

    let splits = trades
        .iter()
        .enumerate()
        .map(|(index, trade)| match lot_remaining[index] {
            Some(unmatched) => {
                ChargeSplit::from_quantities(trade, trade.quantity - unmatched, unmatched)
            }
            None => {
                let intraday = netted[index];
                ChargeSplit::from_quantities(trade, intraday, trade.quantity - intraday)
            }
        })
        .collect();

    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn at(kind: TradeKind, qty: &str, day: u32, hour: u32) -> Trade {
        Trade::new(
            Uuid::nil(),
            kind,
            Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            d(qty),
            d("100"),
        )
    }

    #[test]
    fn test_same_day_round_trip_is_intraday() {
        let trades = vec![
            at(TradeKind::Buy, "100", 4, 4),
            at(TradeKind::Sell, "100", 4, 8),
        ];
        let splits = split_trades(&trades, Kolkata).unwrap();
        for split in &splits {
            assert_eq!(split.quantity(DayKind::Intraday), d("100"));
            assert_eq!(split.quantity(DayKind::Delivery), Decimal::zero());
        }
    }

    #[test]
    fn test_next_day_round_trip_is_delivery() {
        let trades = vec![
            at(TradeKind::Buy, "100", 4, 4),
            at(TradeKind::Sell, "100", 5, 4),
        ];
        let splits = split_trades(&trades, Kolkata).unwrap();
        for split in &splits {
            assert_eq!(split.quantity(DayKind::Delivery), d("100"));
            assert_eq!(split.quantity(DayKind::Intraday), Decimal::zero());
        }
    }

    #[test]
    fn test_nets_most_recent_same_day_lot_first() {
        // Day 1 lot of 50, day 2 lot of 30, day 2 sell of 60:
        // 30 nets against the day 2 lot, the day 1 lot ends matching.
        let trades = vec![
            at(TradeKind::Buy, "50", 4, 4),
            at(TradeKind::Buy, "30", 5, 4),
            at(TradeKind::Sell, "60", 5, 6),
        ];
        let splits = split_trades(&trades, Kolkata).unwrap();
        assert_eq!(splits[0].quantity(DayKind::Delivery), d("50"));
        assert_eq!(splits[1].quantity(DayKind::Intraday), d("30"));
        assert_eq!(splits[2].quantity(DayKind::Intraday), d("30"));
        assert_eq!(splits[2].quantity(DayKind::Delivery), d("30"));
    }

    #[test]
    fn test_day_boundary_follows_exchange_timezone() {
        // 20:00 UTC on the 4th is 01:30 IST on the 5th.
        let trades = vec![
            at(TradeKind::Buy, "10", 4, 10),
            at(TradeKind::Sell, "10", 4, 20),
        ];
        let in_ist = split_trades(&trades, Kolkata).unwrap();
        assert_eq!(in_ist[1].quantity(DayKind::Delivery), d("10"));

        let in_utc = split_trades(&trades, chrono_tz::UTC).unwrap();
        assert_eq!(in_utc[1].quantity(DayKind::Intraday), d("10"));
    }

    #[test]
    fn test_over_close_rejected() {
        let trades = vec![
            at(TradeKind::Buy, "50", 4, 4),
            at(TradeKind::Sell, "80", 4, 5),
        ];
        let err = split_trades(&trades, Kolkata).unwrap_err();
        assert!(matches!(err, ComputeError::OverClose { kind: TradeKind::Sell, .. }));
    }

    #[test]
    fn test_short_home_side() {
        let trades = vec![
            at(TradeKind::Sell, "40", 4, 4),
            at(TradeKind::Buy, "10", 4, 5),
            at(TradeKind::Buy, "30", 6, 5),
        ];
        let splits = split_trades(&trades, Kolkata).unwrap();
        assert_eq!(splits[0].quantity(DayKind::Intraday), d("10"));
        assert_eq!(splits[0].quantity(DayKind::Delivery), d("30"));
        assert_eq!(splits[1].quantity(DayKind::Intraday), d("10"));
        assert_eq!(splits[2].quantity(DayKind::Delivery), d("30"));
    }

    #[test]
    fn test_split_quantities_sum_to_trade_quantity() {
        let trades = vec![
            at(TradeKind::Buy, "7.5", 4, 4),
            at(TradeKind::Buy, "2.5", 4, 5),
            at(TradeKind::Sell, "4", 4, 6),
            at(TradeKind::Buy, "3", 5, 4),
            at(TradeKind::Sell, "9", 5, 6),
        ];
        let splits = split_trades(&trades, Kolkata).unwrap();
        for (trade, split) in trades.iter().zip(&splits) {
            assert_eq!(split.total_quantity(), trade.quantity);
            assert!(!split.parts.is_empty());
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(split_trades(&[], Kolkata).unwrap().is_empty());
    }
}
