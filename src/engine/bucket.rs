//! Partition a time range into contiguous daily, weekly or monthly buckets.

use chrono::{
    DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketPeriod {
    Daily,
    /// Seven days from the start of the range, not calendar weeks.
    Weekly,
    /// Calendar months.
    Monthly,
}

impl FromStr for BucketPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(BucketPeriod::Daily),
            "weekly" => Ok(BucketPeriod::Weekly),
            "monthly" => Ok(BucketPeriod::Monthly),
            other => Err(format!("must be daily, weekly, or monthly, got {}", other)),
        }
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub period: BucketPeriod,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Bucket {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }
}

/// Resolve a local wall-clock time in `tz`: the earliest instant when it is
/// ambiguous, or an hour later when it falls in a DST gap.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Start of `date` in `tz`: midnight, or the first valid local time when
/// midnight falls in a DST gap.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    resolve_local(tz, date.and_time(NaiveTime::MIN))
}

/// The `index`-th boundary after `anchor`, in local wall-clock time.
///
/// Boundaries are offset from the anchor rather than from the previous
/// boundary, so a DST shift never drifts the ones that follow.
fn boundary(period: BucketPeriod, anchor: NaiveDateTime, index: u32, tz: Tz) -> Option<DateTime<Tz>> {
    let naive = match period {
        BucketPeriod::Daily => anchor.checked_add_days(Days::new(u64::from(index)))?,
        BucketPeriod::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(index)))?,
        BucketPeriod::Monthly => anchor.checked_add_months(Months::new(index))?,
    };
    Some(resolve_local(tz, naive))
}

fn label(period: BucketPeriod, start: DateTime<Tz>) -> String {
    match period {
        BucketPeriod::Daily => start.format("%Y-%m-%d").to_string(),
        BucketPeriod::Weekly => format!("Week of {}", start.format("%d %b %Y")),
        BucketPeriod::Monthly => start.format("%b %Y").to_string(),
    }
}

/// Buckets covering `[start, end)` with boundaries in `tz`.
///
/// Monthly buckets begin at the start of the month containing `start`.
/// The last bucket is clipped to `end`. Consecutive buckets share a boundary.
pub fn generate_buckets(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    period: BucketPeriod,
    tz: Tz,
) -> Vec<Bucket> {
    let mut buckets = Vec::new();
    if end <= start {
        return buckets;
    }

    let local_start = start.with_timezone(&tz);
    let (anchor, mut cursor) = match period {
        BucketPeriod::Monthly => match local_start.date_naive().with_day(1) {
            Some(first) => (first.and_time(NaiveTime::MIN), local_midnight(tz, first)),
            None => return buckets,
        },
        BucketPeriod::Daily | BucketPeriod::Weekly => (local_start.naive_local(), local_start),
    };

    let mut index = 0;
    while cursor.with_timezone(&Utc) < end {
        index += 1;
        let Some(next) = boundary(period, anchor, index, tz) else {
            break;
        };
        if next <= cursor {
            break;
        }
        buckets.push(Bucket {
            period,
            label: label(period, cursor),
            start: cursor.with_timezone(&Utc),
            end: next.with_timezone(&Utc).min(end),
        });
        cursor = next;
    }

    buckets
}

/// Index of the bucket containing `time`, by binary search over contiguous buckets.
pub fn find_bucket(buckets: &[Bucket], time: DateTime<Utc>) -> Option<usize> {
    let idx = buckets.partition_point(|b| b.start <= time);
    if idx == 0 {
        return None;
    }
    let candidate = idx - 1;
    buckets[candidate].contains(time).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;
    use chrono_tz::UTC;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn assert_contiguous(buckets: &[Bucket]) {
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
    }

    #[test]
    fn test_daily_buckets() {
        let buckets = generate_buckets(utc(2024, 3, 1, 0), utc(2024, 3, 8, 0), BucketPeriod::Daily, UTC);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].label, "2024-03-01");
        assert_eq!(buckets[6].end, utc(2024, 3, 8, 0));
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_weekly_buckets_start_from_range_start() {
        // 2024-03-06 is a Wednesday; weeks are not calendar aligned.
        let buckets =
            generate_buckets(utc(2024, 3, 6, 0), utc(2024, 3, 30, 0), BucketPeriod::Weekly, UTC);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].start, utc(2024, 3, 6, 0));
        assert_eq!(buckets[1].start, utc(2024, 3, 13, 0));
        assert_eq!(buckets[3].end, utc(2024, 3, 30, 0));
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_monthly_buckets_align_to_calendar() {
        let buckets = generate_buckets(
            utc(2024, 1, 15, 0),
            utc(2024, 4, 10, 0),
            BucketPeriod::Monthly,
            UTC,
        );
        let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Jan 2024", "Feb 2024", "Mar 2024", "Apr 2024"]);
        assert_eq!(buckets[0].start, utc(2024, 1, 1, 0));
        assert_eq!(buckets[1].start, utc(2024, 2, 1, 0));
        assert_eq!(buckets[3].end, utc(2024, 4, 10, 0));
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_monthly_buckets_in_display_timezone() {
        let buckets = generate_buckets(
            utc(2024, 1, 10, 0),
            utc(2024, 3, 1, 0),
            BucketPeriod::Monthly,
            Kolkata,
        );
        // Midnight IST is 18:30 UTC the previous day.
        assert_eq!(buckets[0].start, Utc.with_ymd_and_hms(2023, 12, 31, 18, 30, 0).unwrap());
        assert_eq!(buckets[1].start, Utc.with_ymd_and_hms(2024, 1, 31, 18, 30, 0).unwrap());
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_last_bucket_clipped() {
        let buckets =
            generate_buckets(utc(2024, 3, 1, 0), utc(2024, 3, 2, 12), BucketPeriod::Daily, UTC);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].end, utc(2024, 3, 2, 12));
    }

    #[test]
    fn test_empty_range() {
        assert!(generate_buckets(utc(2024, 3, 2, 0), utc(2024, 3, 1, 0), BucketPeriod::Daily, UTC)
            .is_empty());
    }

    #[test]
    fn test_find_bucket() {
        let buckets = generate_buckets(utc(2024, 3, 1, 0), utc(2024, 3, 4, 0), BucketPeriod::Daily, UTC);
        assert_eq!(find_bucket(&buckets, utc(2024, 3, 1, 0)), Some(0));
        assert_eq!(find_bucket(&buckets, utc(2024, 3, 2, 23)), Some(1));
        assert_eq!(find_bucket(&buckets, utc(2024, 3, 3, 0)), Some(2));
        assert_eq!(find_bucket(&buckets, utc(2024, 2, 29, 23)), None);
        assert_eq!(find_bucket(&buckets, utc(2024, 3, 4, 0)), None);
    }

    #[test]
    fn test_every_instant_maps_to_one_bucket() {
        let buckets = generate_buckets(utc(2024, 1, 1, 0), utc(2024, 2, 1, 0), BucketPeriod::Weekly, UTC);
        let mut t = utc(2024, 1, 1, 0);
        while t < utc(2024, 2, 1, 0) {
            let hits = buckets.iter().filter(|b| b.contains(t)).count();
            assert_eq!(hits, 1);
            let idx = find_bucket(&buckets, t).unwrap();
            assert!(buckets[idx].contains(t));
            t += Duration::hours(5);
        }
    }

    #[test]
    fn test_local_midnight_in_dst_gap() {
        // Sao Paulo skipped 00:00-01:00 on 2018-11-04; the day starts at 01:00 -02.
        let date = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        let start = local_midnight(chrono_tz::America::Sao_Paulo, date);
        assert_eq!(start.with_timezone(&Utc), utc(2018, 11, 4, 3));
        assert_eq!(start.date_naive(), date);
    }

    #[test]
    fn test_daily_buckets_across_dst_gap() {
        let tz = chrono_tz::America::Sao_Paulo;
        // 2018-11-03 00:00 -03 to 2018-11-06 00:00 -02.
        let buckets =
            generate_buckets(utc(2018, 11, 3, 3), utc(2018, 11, 6, 2), BucketPeriod::Daily, tz);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[1].start, utc(2018, 11, 4, 3));
        assert_eq!(buckets[1].label, "2018-11-04");
        // Back on local midnight the day after the gap.
        assert_eq!(buckets[2].start, utc(2018, 11, 5, 2));
        assert_eq!(buckets[2].label, "2018-11-05");
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("weekly".parse::<BucketPeriod>(), Ok(BucketPeriod::Weekly));
        assert!("hourly".parse::<BucketPeriod>().is_err());
    }
}
