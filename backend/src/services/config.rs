//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once (from `repository.toml` or defaults)
//! and handed to the pipeline at construction. Business logic never reads
//! the environment.

use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::Series;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// How a bucket mean is converted to an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Ties round up: 10.5 → 11.
    #[default]
    HalfUp,
    /// Ties round to the even neighbour: 10.5 → 10, 11.5 → 12.
    HalfEven,
}

impl RoundingMode {
    /// Round `sum / count` to an integer without going through floats.
    ///
    /// `count` must be non-zero.
    pub fn divide(&self, sum: u64, count: u64) -> u64 {
        let quotient = sum / count;
        let remainder = sum % count;
        // Compare 2r with n to classify the fractional part against one half.
        match (2 * remainder).cmp(&count) {
            std::cmp::Ordering::Less => quotient,
            std::cmp::Ordering::Greater => quotient + 1,
            std::cmp::Ordering::Equal => match self {
                RoundingMode::HalfUp => quotient + 1,
                RoundingMode::HalfEven => quotient + (quotient % 2),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::HalfUp => "half_up",
            RoundingMode::HalfEven => "half_even",
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "half_up" => Ok(RoundingMode::HalfUp),
            "half_even" | "bankers" => Ok(RoundingMode::HalfEven),
            _ => Err(format!("Unknown rounding mode: {}", s)),
        }
    }
}

/// Settings for one history cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Trailing window of samples considered, in days.
    pub window_days: u32,
    /// First local time of day that counts as open (inclusive).
    pub open_from: NaiveTime,
    /// Local closing time (exclusive).
    pub open_until: NaiveTime,
    /// Sampling slot width; time of day is floored to a multiple of it.
    pub slot_minutes: u32,
    /// Series whose readings decide whether a day was a closure.
    pub closed_day_indicator: Series,
    /// A day is closed when the indicator never exceeds this value.
    pub closed_day_threshold: u32,
    /// Facility time zone used for weekday and time-of-day bucketing.
    pub timezone: Tz,
    pub rounding: RoundingMode,
    /// Upper bound on any single store call made by the pipeline.
    pub store_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            open_from: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            open_until: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 15,
            closed_day_indicator: Series::Family,
            closed_day_threshold: 0,
            timezone: chrono_tz::Europe::Warsaw,
            rounding: RoundingMode::HalfUp,
            store_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    /// Check that the settings describe a usable cycle.
    pub fn validate(&self) -> RepositoryResult<()> {
        if self.window_days == 0 {
            return Err(RepositoryError::configuration(
                "pipeline.window_days must be at least 1",
            ));
        }
        if self.open_from >= self.open_until {
            return Err(RepositoryError::configuration(format!(
                "pipeline.open_from ({}) must be earlier than pipeline.open_until ({})",
                self.open_from.format("%H:%M"),
                self.open_until.format("%H:%M")
            )));
        }
        if self.slot_minutes == 0 || MINUTES_PER_DAY % self.slot_minutes != 0 {
            return Err(RepositoryError::configuration(format!(
                "pipeline.slot_minutes must divide a day evenly, got {}",
                self.slot_minutes
            )));
        }
        if self.store_timeout.is_zero() {
            return Err(RepositoryError::configuration(
                "pipeline.store_timeout_sec must be positive",
            ));
        }
        Ok(())
    }

    /// Floor a local time of day to the start of its sampling slot.
    pub fn slot_start(&self, time: NaiveTime) -> NaiveTime {
        let minute_of_day = time.hour() * 60 + time.minute();
        let floored = minute_of_day - minute_of_day % self.slot_minutes.max(1);
        NaiveTime::from_hms_opt(floored / 60, floored % 60, 0).unwrap_or(time)
    }

    /// Whether a local time of day falls inside the opening window.
    pub fn is_open_at(&self, time: NaiveTime) -> bool {
        time >= self.open_from && time < self.open_until
    }
}
