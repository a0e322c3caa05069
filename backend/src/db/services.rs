//! High-level database service layer.
//!
//! Repository-agnostic operations used by the ingestion path and by
//! consumers of the summary table (charts, the assistant's context step).
//! Everything here works with any [`FullRepository`] implementation.
//!
//! ```no_run
//! use pool_history::db::{services, repositories::LocalRepository};
//! use chrono::Weekday;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = LocalRepository::new();
//! for line in services::weekday_overview(&repo, Weekday::Mon).await? {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{NaiveTime, Weekday};
use log::{debug, info};

use super::repository::{
    ErrorContext, FullRepository, RepositoryError, RepositoryResult, SampleRepository,
    SummaryRepository,
};
use crate::models::{BucketKey, NewSample, SampleId, SummaryBucket};

// ==================== Health & Connection ====================

/// Pass-through to the repository's health check.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Ingestion ====================

/// Validate and store one scraped reading.
///
/// # Returns
/// * `Ok(SampleId)` - Identifier assigned by the store
/// * `Err(RepositoryError::ValidationError)` - If any count is negative;
///   nothing is written
pub async fn record_sample<R: SampleRepository + ?Sized>(
    repo: &R,
    sample: &NewSample,
) -> RepositoryResult<SampleId> {
    let readings = sample.readings;
    if let Some(series) = readings.first_negative() {
        return Err(RepositoryError::validation_with_context(
            format!(
                "Negative {} reading: {}",
                series.as_str(),
                readings.get(series)
            ),
            ErrorContext::new("record_sample").with_entity("sample"),
        ));
    }

    let id = repo.insert_sample(sample).await?;
    debug!("Recorded sample {} at {}", id, sample.timestamp);
    Ok(id)
}

// ==================== Summary Queries ====================

/// Get the summary row for one weekday and time of day.
pub async fn get_summary<R: SummaryRepository + ?Sized>(
    repo: &R,
    weekday: Weekday,
    time_of_day: NaiveTime,
) -> RepositoryResult<Option<SummaryBucket>> {
    repo.get_summary(BucketKey::new(weekday, time_of_day)).await
}

/// All summary rows for a weekday, ordered by time of day.
pub async fn get_summary_for_weekday<R: SummaryRepository + ?Sized>(
    repo: &R,
    weekday: Weekday,
) -> RepositoryResult<Vec<SummaryBucket>> {
    let mut rows = repo.get_summary_for_weekday(weekday).await?;
    rows.sort_by_key(|b| b.key.time_of_day);
    Ok(rows)
}

/// The whole summary table, Monday→Sunday then by time of day.
pub async fn list_summary<R: SummaryRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Vec<SummaryBucket>> {
    let mut rows = repo.list_summary().await?;
    crate::models::sort_for_display(&mut rows);
    Ok(rows)
}

/// A weekday's averages as plain text lines,
/// `HH:MM sport=.. family=.. small=.. ice=..`.
///
/// Empty when no history exists yet for that weekday.
pub async fn weekday_overview<R: SummaryRepository + ?Sized>(
    repo: &R,
    weekday: Weekday,
) -> RepositoryResult<Vec<String>> {
    let rows = get_summary_for_weekday(repo, weekday).await?;
    info!("Built {} overview lines for {}", rows.len(), weekday);
    Ok(rows.iter().map(SummaryBucket::overview_line).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::models::SeriesValues;
    use chrono::{TimeZone, Utc};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_record_sample_rejects_negative_counts() {
        let repo = LocalRepository::new();
        let ts = Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap();

        let err = record_sample(&repo, &NewSample::new(ts, 3, 4, -1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert_eq!(repo.sample_count(), 0);

        record_sample(&repo, &NewSample::new(ts, 3, 4, 1, 0))
            .await
            .unwrap();
        assert_eq!(repo.sample_count(), 1);
    }

    #[tokio::test]
    async fn test_weekday_overview_lines() {
        let repo = LocalRepository::new();
        for (time, sport) in [(t(7, 0), 12), (t(6, 45), 3)] {
            repo.upsert_summary_bucket(&SummaryBucket::new(
                BucketKey::new(Weekday::Thu, time),
                SeriesValues::new(sport, 20, 4, 0),
            ))
            .await
            .unwrap();
        }

        let lines = weekday_overview(&repo, Weekday::Thu).await.unwrap();
        assert_eq!(
            lines,
            vec![
                "06:45 sport=3 family=20 small=4 ice=0".to_string(),
                "07:00 sport=12 family=20 small=4 ice=0".to_string(),
            ]
        );
        assert!(weekday_overview(&repo, Weekday::Fri).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_summary_missing_key() {
        let repo = LocalRepository::new();
        assert!(get_summary(&repo, Weekday::Mon, t(9, 0)).await.unwrap().is_none());
    }
}
