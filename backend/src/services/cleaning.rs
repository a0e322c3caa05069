//! Cleaning and bucketing of raw samples.
//!
//! Three filters run in order, each counted in the [`CleaningReport`]:
//!
//! 1. malformed rows (any negative count)
//! 2. rows outside the opening window, judged in facility local time
//! 3. whole local days on which the closed-day indicator never rose above
//!    its threshold
//!
//! Survivors are tagged with weekday, slot-floored time of day and calendar
//! day. Input order is preserved. The report also records the observation
//! range and how many working days the survivors cover.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::config::PipelineConfig;
use crate::models::{CleanedSample, RawSample};

/// Counts of what the cleaning stage kept and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input: usize,
    pub malformed: usize,
    pub off_hours: usize,
    /// Local days dropped as closures.
    pub closed_days: usize,
    /// Samples dropped together with those days.
    pub closed_day_samples: usize,
    pub retained: usize,
    /// Earliest retained reading.
    pub first_sample: Option<DateTime<Utc>>,
    /// Latest retained reading.
    pub last_sample: Option<DateTime<Utc>>,
    /// Distinct local days the retained readings cover.
    pub open_days: usize,
}

impl CleaningReport {
    /// Span between the first and last retained reading.
    pub fn observation_span(&self) -> Option<chrono::Duration> {
        Some(self.last_sample? - self.first_sample?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleaningOutcome {
    pub samples: Vec<CleanedSample>,
    pub report: CleaningReport,
}

impl CleaningOutcome {
    /// Nothing left to aggregate.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Run all filters over `samples` and tag the survivors.
pub fn clean_samples(samples: &[RawSample], config: &PipelineConfig) -> CleaningOutcome {
    let mut report = CleaningReport {
        input: samples.len(),
        ..Default::default()
    };

    let mut open_rows = Vec::with_capacity(samples.len());
    for sample in samples {
        let Some(counts) = sample.valid_counts() else {
            report.malformed += 1;
            log::warn!(
                "Skipping malformed sample {} at {}: negative {} reading",
                sample.id,
                sample.timestamp,
                sample
                    .first_invalid_series()
                    .map(|s| s.as_str())
                    .unwrap_or("unknown")
            );
            continue;
        };

        let local = sample.timestamp.with_timezone(&config.timezone);
        let local_time = local.time();
        if !config.is_open_at(local_time) {
            report.off_hours += 1;
            continue;
        }

        open_rows.push(CleanedSample {
            id: sample.id,
            timestamp: sample.timestamp,
            weekday: local.weekday(),
            time_of_day: config.slot_start(local_time),
            calendar_day: local.date_naive(),
            counts,
        });
    }

    let closed = closed_days(&open_rows, config);
    if !closed.is_empty() {
        log::info!(
            "Dropping {} closed day(s) where {} never exceeded {}",
            closed.len(),
            config.closed_day_indicator,
            config.closed_day_threshold
        );
    }
    report.closed_days = closed.len();

    let before = open_rows.len();
    open_rows.retain(|row| !closed.contains(&row.calendar_day));
    report.closed_day_samples = before - open_rows.len();
    report.retained = open_rows.len();
    report.first_sample = open_rows.iter().map(|row| row.timestamp).min();
    report.last_sample = open_rows.iter().map(|row| row.timestamp).max();
    report.open_days = open_rows
        .iter()
        .map(|row| row.calendar_day)
        .collect::<HashSet<_>>()
        .len();

    CleaningOutcome {
        samples: open_rows,
        report,
    }
}

/// Local days on which every open-hours reading of the indicator series is
/// at or below the threshold.
fn closed_days(rows: &[CleanedSample], config: &PipelineConfig) -> HashSet<NaiveDate> {
    let mut day_is_active: BTreeMap<NaiveDate, bool> = BTreeMap::new();
    for row in rows {
        let active = row.counts.get(config.closed_day_indicator) > config.closed_day_threshold;
        *day_is_active.entry(row.calendar_day).or_insert(false) |= active;
    }
    day_is_active
        .into_iter()
        .filter_map(|(day, active)| (!active).then_some(day))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SampleId, Series, SeriesValues};
    use chrono::{NaiveTime, TimeZone, Utc, Weekday};

    // UTC config keeps local time equal to the stored timestamp.
    fn utc_config() -> PipelineConfig {
        PipelineConfig {
            timezone: chrono_tz::UTC,
            ..Default::default()
        }
    }

    fn raw(day: u32, h: u32, m: u32, values: [i32; 4]) -> RawSample {
        RawSample {
            id: SampleId::generate(),
            // 2024-07-01 is a Monday
            timestamp: Utc.with_ymd_and_hms(2024, 7, day, h, m, 0).unwrap(),
            readings: SeriesValues::from_array(values),
        }
    }

    #[test]
    fn test_malformed_rows_are_counted_not_fatal() {
        let samples = vec![raw(1, 10, 0, [1, 5, 1, 1]), raw(1, 10, 15, [1, -2, 1, 1])];
        let outcome = clean_samples(&samples, &utc_config());

        assert_eq!(outcome.report.malformed, 1);
        assert_eq!(outcome.report.retained, 1);
        assert_eq!(outcome.samples[0].id, samples[0].id);
    }

    #[test]
    fn test_off_hours_boundaries() {
        let samples = vec![
            raw(1, 5, 59, [1, 5, 1, 1]),
            raw(1, 6, 0, [1, 5, 1, 1]),
            raw(1, 21, 59, [1, 5, 1, 1]),
            raw(1, 22, 0, [1, 5, 1, 1]),
        ];
        let outcome = clean_samples(&samples, &utc_config());

        assert_eq!(outcome.report.off_hours, 2);
        let times: Vec<_> = outcome.samples.iter().map(|s| s.time_of_day).collect();
        assert_eq!(
            times,
            vec![
                NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(21, 45, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_closed_day_is_dropped_entirely() {
        let samples = vec![
            // Monday: family always zero, other series busy
            raw(1, 9, 0, [40, 0, 10, 80]),
            raw(1, 12, 0, [35, 0, 12, 60]),
            // Tuesday: open
            raw(2, 9, 0, [20, 3, 5, 10]),
        ];
        let outcome = clean_samples(&samples, &utc_config());

        assert_eq!(outcome.report.closed_days, 1);
        assert_eq!(outcome.report.closed_day_samples, 2);
        assert_eq!(outcome.samples.len(), 1);
        assert_eq!(outcome.samples[0].weekday, Weekday::Tue);
    }

    #[test]
    fn test_closed_day_ignores_off_hours_activity() {
        // Only the off-hours row shows family activity; the day still counts as closed.
        let samples = vec![raw(1, 23, 0, [0, 9, 0, 0]), raw(1, 10, 0, [5, 0, 1, 1])];
        let outcome = clean_samples(&samples, &utc_config());

        assert_eq!(outcome.report.off_hours, 1);
        assert_eq!(outcome.report.closed_days, 1);
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_indicator_and_threshold_are_configurable() {
        let config = PipelineConfig {
            closed_day_indicator: Series::Ice,
            closed_day_threshold: 5,
            ..utc_config()
        };
        let samples = vec![raw(1, 10, 0, [10, 10, 10, 5]), raw(2, 10, 0, [10, 10, 10, 6])];
        let outcome = clean_samples(&samples, &config);

        assert_eq!(outcome.report.closed_days, 1);
        assert_eq!(outcome.samples.len(), 1);
        assert_eq!(outcome.samples[0].calendar_day, NaiveDate::from_ymd_opt(2024, 7, 2).unwrap());
    }

    #[test]
    fn test_bucketing_uses_facility_timezone() {
        // 2024-07-01 04:30 UTC is 06:30 in Warsaw (CEST, UTC+2).
        let config = PipelineConfig::default();
        let samples = vec![raw(1, 4, 30, [1, 1, 1, 1])];
        let outcome = clean_samples(&samples, &config);

        assert_eq!(outcome.report.retained, 1);
        let cleaned = &outcome.samples[0];
        assert_eq!(cleaned.weekday, Weekday::Mon);
        assert_eq!(cleaned.time_of_day, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
    }

    #[test]
    fn test_local_midnight_crossing_changes_weekday() {
        // Sunday 22:30 UTC is Monday 00:30 in Warsaw, which is off-hours,
        // while Monday 20:30 UTC is Monday 22:30 local, also off-hours.
        let config = PipelineConfig::default();
        let samples = vec![
            RawSample {
                id: SampleId::generate(),
                timestamp: Utc.with_ymd_and_hms(2024, 6, 30, 22, 30, 0).unwrap(),
                readings: SeriesValues::new(1, 1, 1, 1),
            },
            raw(1, 20, 30, [1, 1, 1, 1]),
            raw(1, 19, 50, [1, 1, 1, 1]),
        ];
        let outcome = clean_samples(&samples, &config);

        assert_eq!(outcome.report.off_hours, 2);
        assert_eq!(outcome.samples[0].time_of_day, NaiveTime::from_hms_opt(21, 45, 0).unwrap());
    }

    #[test]
    fn test_report_covers_observation_range_and_open_days() {
        let samples = vec![
            raw(2, 9, 0, [20, 3, 5, 10]),
            // closed Wednesday does not widen the range
            raw(3, 7, 0, [1, 0, 1, 1]),
            raw(1, 18, 30, [20, 4, 5, 10]),
            raw(1, 8, 0, [20, 2, 5, 10]),
            // off-hours rows do not count either
            raw(4, 23, 0, [20, 2, 5, 10]),
        ];
        let outcome = clean_samples(&samples, &utc_config());
        let report = &outcome.report;

        assert_eq!(report.first_sample, Some(samples[3].timestamp));
        assert_eq!(report.last_sample, Some(samples[0].timestamp));
        assert_eq!(report.open_days, 2);
        assert_eq!(
            report.observation_span(),
            Some(chrono::Duration::hours(25))
        );
    }

    #[test]
    fn test_everything_discarded_yields_empty() {
        let samples = vec![raw(1, 3, 0, [1, 1, 1, 1]), raw(1, 10, 0, [-1, 1, 1, 1])];
        let outcome = clean_samples(&samples, &utc_config());
        assert!(outcome.is_empty());
        assert_eq!(outcome.report.retained, 0);
        assert_eq!(outcome.report.input, 2);
        assert_eq!(outcome.report.open_days, 0);
        assert_eq!(outcome.report.first_sample, None);
        assert_eq!(outcome.report.observation_span(), None);
    }
}
