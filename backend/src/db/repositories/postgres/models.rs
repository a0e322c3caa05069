use chrono::{DateTime, NaiveTime, Utc, Weekday};
use diesel::prelude::*;

use super::schema::{pool_samples, pool_summary};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{BucketKey, NewSample, RawSample, SampleId, SeriesValues, SummaryBucket};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pool_samples)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SampleRow {
    pub sample_id: uuid::Uuid,
    pub recorded_at: DateTime<Utc>,
    pub sport: i32,
    pub family: i32,
    pub small: i32,
    pub ice: i32,
}

impl From<SampleRow> for RawSample {
    fn from(row: SampleRow) -> Self {
        RawSample {
            id: SampleId::new(row.sample_id),
            timestamp: row.recorded_at,
            readings: SeriesValues::new(row.sport, row.family, row.small, row.ice),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pool_samples)]
pub struct NewSampleRow {
    pub sample_id: uuid::Uuid,
    pub recorded_at: DateTime<Utc>,
    pub sport: i32,
    pub family: i32,
    pub small: i32,
    pub ice: i32,
}

impl NewSampleRow {
    pub fn from_sample(id: SampleId, sample: &NewSample) -> Self {
        Self {
            sample_id: id.value(),
            recorded_at: sample.timestamp,
            sport: sample.readings.sport,
            family: sample.readings.family,
            small: sample.readings.small,
            ice: sample.readings.ice,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pool_summary)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // updated_at is maintained by the database
pub struct SummaryRow {
    pub weekday: i16,
    pub time_of_day: NaiveTime,
    pub sport_avg: i32,
    pub family_avg: i32,
    pub small_avg: i32,
    pub ice_avg: i32,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for SummaryBucket {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> RepositoryResult<Self> {
        let weekday = weekday_from_db(row.weekday)?;
        let avg = |value: i32, column: &str| {
            u32::try_from(value).map_err(|_| {
                RepositoryError::validation(format!(
                    "Negative {} in pool_summary row: {}",
                    column, value
                ))
            })
        };
        Ok(SummaryBucket::new(
            BucketKey::new(weekday, row.time_of_day),
            SeriesValues::new(
                avg(row.sport_avg, "sport_avg")?,
                avg(row.family_avg, "family_avg")?,
                avg(row.small_avg, "small_avg")?,
                avg(row.ice_avg, "ice_avg")?,
            ),
        ))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pool_summary)]
pub struct SummaryUpsertRow {
    pub weekday: i16,
    pub time_of_day: NaiveTime,
    pub sport_avg: i32,
    pub family_avg: i32,
    pub small_avg: i32,
    pub ice_avg: i32,
    pub updated_at: DateTime<Utc>,
}

impl SummaryUpsertRow {
    pub fn from_bucket(bucket: &SummaryBucket, updated_at: DateTime<Utc>) -> RepositoryResult<Self> {
        let avg = |value: u32| {
            i32::try_from(value).map_err(|_| {
                RepositoryError::validation(format!("Average out of range: {}", value))
            })
        };
        Ok(Self {
            weekday: weekday_to_db(bucket.key.weekday),
            time_of_day: bucket.key.time_of_day,
            sport_avg: avg(bucket.averages.sport)?,
            family_avg: avg(bucket.averages.family)?,
            small_avg: avg(bucket.averages.small)?,
            ice_avg: avg(bucket.averages.ice)?,
            updated_at,
        })
    }
}

/// Monday = 0 .. Sunday = 6.
pub fn weekday_to_db(weekday: Weekday) -> i16 {
    weekday.num_days_from_monday() as i16
}

pub fn weekday_from_db(value: i16) -> RepositoryResult<Weekday> {
    const WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    usize::try_from(value)
        .ok()
        .and_then(|v| WEEKDAYS.get(v).copied())
        .ok_or_else(|| RepositoryError::validation(format!("Invalid weekday in database: {}", value)))
}
