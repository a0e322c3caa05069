//! Weekday × time-of-day summary rows.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::series::{Series, SeriesValues};

/// Unique key of a summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub weekday: Weekday,
    pub time_of_day: NaiveTime,
}

impl BucketKey {
    pub fn new(weekday: Weekday, time_of_day: NaiveTime) -> Self {
        Self {
            weekday,
            time_of_day,
        }
    }
}

impl Ord for BucketKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weekday
            .num_days_from_monday()
            .cmp(&other.weekday.num_days_from_monday())
            .then(self.time_of_day.cmp(&other.time_of_day))
    }
}

impl PartialOrd for BucketKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.weekday, self.time_of_day.format("%H:%M"))
    }
}

/// Rounded average occupancy for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBucket {
    pub key: BucketKey,
    pub averages: SeriesValues<u32>,
}

impl SummaryBucket {
    pub fn new(key: BucketKey, averages: SeriesValues<u32>) -> Self {
        Self { key, averages }
    }

    pub fn weekday(&self) -> Weekday {
        self.key.weekday
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.key.time_of_day
    }

    pub fn average(&self, series: Series) -> u32 {
        self.averages.get(series)
    }

    /// Average occupancy as a percentage of the facility's nominal capacity.
    pub fn occupancy_percent(&self, series: Series) -> f64 {
        f64::from(self.average(series)) * 100.0 / f64::from(series.capacity())
    }

    /// One line of the plain-text weekday overview.
    pub fn overview_line(&self) -> String {
        format!(
            "{} sport={} family={} small={} ice={}",
            self.key.time_of_day.format("%H:%M"),
            self.averages.sport,
            self.averages.family,
            self.averages.small,
            self.averages.ice
        )
    }
}

/// Sort buckets Monday→Sunday, then by time of day.
pub fn sort_for_display(buckets: &mut [SummaryBucket]) {
    buckets.sort_by_key(|b| b.key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_bucket_key_orders_monday_first() {
        let sunday = BucketKey::new(Weekday::Sun, t(6, 0));
        let monday_late = BucketKey::new(Weekday::Mon, t(21, 45));
        let monday_early = BucketKey::new(Weekday::Mon, t(6, 0));

        let mut keys = vec![sunday, monday_late, monday_early];
        keys.sort();
        assert_eq!(keys, vec![monday_early, monday_late, sunday]);
    }

    #[test]
    fn test_occupancy_percent() {
        let bucket = SummaryBucket::new(
            BucketKey::new(Weekday::Tue, t(9, 0)),
            SeriesValues::new(21, 75, 3, 150),
        );
        assert!((bucket.occupancy_percent(Series::Sport) - 20.0).abs() < 1e-9);
        assert!((bucket.occupancy_percent(Series::Family) - 50.0).abs() < 1e-9);
        assert!((bucket.occupancy_percent(Series::Small) - 10.0).abs() < 1e-9);
        assert!((bucket.occupancy_percent(Series::Ice) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_overview_line() {
        let bucket = SummaryBucket::new(
            BucketKey::new(Weekday::Wed, t(10, 15)),
            SeriesValues::new(5, 12, 0, 40),
        );
        assert_eq!(bucket.overview_line(), "10:15 sport=5 family=12 small=0 ice=40");
    }
}
