//! Raw occupancy readings as stored by the ingestion path.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::series::{Series, SeriesValues};

crate::define_id_type!(uuid::Uuid, SampleId);

impl SampleId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        SampleId(uuid::Uuid::new_v4())
    }
}

/// One stored reading of all four facilities.
///
/// Counts are kept signed so that a faulty ingestion write is still
/// representable; the cleaning stage rejects negative values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub id: SampleId,
    pub timestamp: DateTime<Utc>,
    pub readings: SeriesValues<i32>,
}

impl RawSample {
    /// Series holding a negative count, if any.
    pub fn first_invalid_series(&self) -> Option<Series> {
        self.readings.first_negative()
    }

    /// Validated non-negative counts, `None` when any reading is out of range.
    pub fn valid_counts(&self) -> Option<SeriesValues<u32>> {
        let values = self.readings.to_array();
        let mut out = [0u32; 4];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = u32::try_from(value).ok()?;
        }
        Some(SeriesValues::from_array(out))
    }
}

/// Insert payload for a new reading; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSample {
    pub timestamp: DateTime<Utc>,
    pub readings: SeriesValues<i32>,
}

impl NewSample {
    pub fn new(timestamp: DateTime<Utc>, sport: i32, family: i32, small: i32, ice: i32) -> Self {
        Self {
            timestamp,
            readings: SeriesValues::new(sport, family, small, ice),
        }
    }
}

/// A reading that survived cleaning, tagged with its bucket coordinates
/// in the facility's local time.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSample {
    pub id: SampleId,
    pub timestamp: DateTime<Utc>,
    pub weekday: Weekday,
    pub time_of_day: NaiveTime,
    pub calendar_day: NaiveDate,
    pub counts: SeriesValues<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(readings: SeriesValues<i32>) -> RawSample {
        RawSample {
            id: SampleId::generate(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 10, 30, 0).unwrap(),
            readings,
        }
    }

    #[test]
    fn test_valid_counts() {
        let s = sample(SeriesValues::new(10, 11, 5, 1));
        assert_eq!(s.valid_counts(), Some(SeriesValues::new(10, 11, 5, 1)));
        assert_eq!(s.first_invalid_series(), None);
    }

    #[test]
    fn test_negative_reading_is_invalid() {
        let s = sample(SeriesValues::new(10, 11, -3, 1));
        assert_eq!(s.valid_counts(), None);
        assert_eq!(s.first_invalid_series(), Some(Series::Small));
    }
}
