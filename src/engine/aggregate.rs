//! Time-bucketed P&L series over many positions.

use crate::domain::{Decimal, Position};
use crate::error::ComputeError;
use chrono::{DateTime, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::bucket::{find_bucket, generate_buckets, local_midnight, Bucket, BucketPeriod};
use super::compute::trade_effects;
use super::TradeEffect;

/// A bucket with the P&L realized inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlBucket {
    #[serde(flatten)]
    pub bucket: Bucket,
    pub gross_pnl: Decimal,
    pub net_pnl: Decimal,
    pub charges: Decimal,
    /// Realizing trades that fell in the bucket.
    pub trade_count: usize,
}

impl PnlBucket {
    fn empty(bucket: Bucket) -> Self {
        Self {
            bucket,
            gross_pnl: Decimal::zero(),
            net_pnl: Decimal::zero(),
            charges: Decimal::zero(),
            trade_count: 0,
        }
    }

    fn rounded(mut self) -> Self {
        self.gross_pnl = self.gross_pnl.round_money();
        self.net_pnl = self.net_pnl.round_money();
        self.charges = self.charges.round_money();
        self
    }
}

/// One day of a P&L calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub gross_pnl: Decimal,
    pub net_pnl: Decimal,
    pub charges: Decimal,
    pub trade_count: usize,
    /// Positions whose closing trade fell on this day.
    pub closed_positions: usize,
}

/// Running totals of the last realizing trade seen for a position.
#[derive(Debug, Clone, Copy, Default)]
struct Realized {
    gross: Decimal,
    charges: Decimal,
}

/// Realized P&L per bucket for `[start, end)`.
pub fn pnl_buckets(
    positions: &[Position],
    period: BucketPeriod,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
) -> Result<Vec<PnlBucket>, ComputeError> {
    let buckets = generate_buckets(start, end, period, tz);
    accumulate(positions, buckets)
}

/// Assign every realizing trade to its bucket.
///
/// Charges booked to a bucket are the growth of the position's cumulative
/// charges since its previous realizing trade, so charges computed once for
/// a whole position are never counted twice. The closing trade also carries
/// any difference between the position's final charges and its trade charges.
fn accumulate(positions: &[Position], buckets: Vec<Bucket>) -> Result<Vec<PnlBucket>, ComputeError> {
    let mut effects_by_position: Vec<Vec<TradeEffect>> = Vec::with_capacity(positions.len());
    for position in positions {
        effects_by_position.push(trade_effects(&position.trades)?);
    }

    let mut pooled: Vec<(usize, &TradeEffect)> = effects_by_position
        .iter()
        .enumerate()
        .flat_map(|(p, effects)| effects.iter().map(move |e| (p, e)))
        .collect();
    pooled.sort_by_key(|(_, e)| e.time);

    let mut out: Vec<PnlBucket> = buckets.iter().cloned().map(PnlBucket::empty).collect();
    let mut last = vec![Realized::default(); positions.len()];

    for (p, effect) in pooled {
        if !effect.is_scale_out() {
            continue;
        }

        let mut charges = effect.cumulative_charges;
        if effect.open_quantity.is_zero() {
            charges = positions[p].charges;
        }
        let gross_delta = effect.cumulative_gross_pnl - last[p].gross;
        let charge_delta = charges - last[p].charges;
        last[p] = Realized {
            gross: effect.cumulative_gross_pnl,
            charges,
        };

        let Some(idx) = find_bucket(&buckets, effect.time) else {
            continue;
        };
        let bucket = &mut out[idx];
        bucket.gross_pnl += gross_delta;
        bucket.charges += charge_delta;
        bucket.net_pnl += gross_delta - charge_delta;
        bucket.trade_count += 1;
    }

    Ok(out.into_iter().map(PnlBucket::rounded).collect())
}

/// Running totals: each bucket carries the sum of itself and every bucket before it.
pub fn cumulative(buckets: &[PnlBucket]) -> Vec<PnlBucket> {
    let mut gross = Decimal::zero();
    let mut net = Decimal::zero();
    let mut charges = Decimal::zero();
    let mut trades = 0;

    buckets
        .iter()
        .map(|b| {
            gross += b.gross_pnl;
            net += b.net_pnl;
            charges += b.charges;
            trades += b.trade_count;
            PnlBucket {
                bucket: b.bucket.clone(),
                gross_pnl: gross,
                net_pnl: net,
                charges,
                trade_count: trades,
            }
        })
        .collect()
}

/// Daily P&L for one calendar month in `tz`.
pub fn calendar_month(
    positions: &[Position],
    year: i32,
    month: u32,
    tz: Tz,
) -> Result<Vec<CalendarDay>, ComputeError> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Ok(Vec::new());
    };
    let Some(next) = first.checked_add_months(Months::new(1)) else {
        return Ok(Vec::new());
    };
    let start = local_midnight(tz, first).with_timezone(&Utc);
    let end = local_midnight(tz, next).with_timezone(&Utc);

    let buckets = generate_buckets(start, end, BucketPeriod::Daily, tz);
    let mut closed = vec![0usize; buckets.len()];
    for closed_at in positions.iter().filter_map(|p| p.closed_at) {
        if let Some(idx) = find_bucket(&buckets, closed_at) {
            closed[idx] += 1;
        }
    }

    let days = accumulate(positions, buckets)?
        .into_iter()
        .zip(closed)
        .map(|(b, closed_positions)| CalendarDay {
            date: b.bucket.start.with_timezone(&tz).date_naive(),
            gross_pnl: b.gross_pnl,
            net_pnl: b.net_pnl,
            charges: b.charges,
            trade_count: b.trade_count,
            closed_positions,
        })
        .collect();

    Ok(days)
}
