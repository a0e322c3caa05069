//! Summary synchronizer: upserts averaged buckets into the summary store.

use serde::Serialize;
use std::time::Duration;

use super::bounded;
use crate::db::repository::{
    ErrorContext, RepositoryError, RepositoryHealth, SummaryRepository,
};
use crate::models::{BucketKey, SummaryBucket};

/// Outcome of a synchronization pass that reached the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub written: usize,
    /// Keys whose upsert failed, in the order they were attempted.
    pub failed_keys: Vec<BucketKey>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed_keys.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The store was unreachable before any write was attempted.
    #[error("Summary store unavailable: {0}")]
    StoreUnavailable(#[source] RepositoryError),
}

/// Upsert every bucket, isolating per-key failures.
///
/// The store is health-checked first; if it is unreachable nothing is
/// written. Existing rows whose keys are absent from `buckets` are left
/// untouched.
pub async fn sync_buckets<R>(
    repo: &R,
    buckets: &[SummaryBucket],
    timeout: Duration,
) -> Result<SyncReport, SyncError>
where
    R: SummaryRepository + ?Sized,
{
    match bounded(timeout, "health_check", repo.health_check()).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(SyncError::StoreUnavailable(
                RepositoryError::connection_with_context(
                    "Health check reported the store as unhealthy",
                    ErrorContext::new("health_check").with_entity("summary"),
                ),
            ))
        }
        Err(e) => return Err(SyncError::StoreUnavailable(e)),
    }

    let mut report = SyncReport::default();
    for bucket in buckets {
        let upsert = repo.upsert_summary_bucket(bucket);
        match bounded(timeout, "upsert_summary_bucket", upsert).await {
            Ok(()) => {
                report.written += 1;
                log::debug!("Upserted bucket {}", bucket.key);
            }
            Err(e) => {
                log::warn!("Failed to upsert bucket {}: {}", bucket.key, e);
                report.failed_keys.push(bucket.key);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::models::SeriesValues;
    use chrono::{NaiveTime, Weekday};

    fn bucket(weekday: Weekday, h: u32, avg: u32) -> SummaryBucket {
        SummaryBucket::new(
            BucketKey::new(weekday, NaiveTime::from_hms_opt(h, 0, 0).unwrap()),
            SeriesValues::new(avg, avg, avg, avg),
        )
    }

    #[tokio::test]
    async fn test_unavailable_store_writes_nothing() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);

        let buckets = [bucket(Weekday::Mon, 9, 1)];
        let result = sync_buckets(&repo, &buckets, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(SyncError::StoreUnavailable(_))));

        repo.set_healthy(true);
        assert_eq!(repo.summary_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_key_does_not_stop_others() {
        let repo = LocalRepository::new();
        let buckets = vec![
            bucket(Weekday::Tue, 8, 1),
            bucket(Weekday::Tue, 9, 2),
            bucket(Weekday::Tue, 10, 3),
        ];
        repo.fail_writes_for(buckets[1].key);

        let report = sync_buckets(&repo, &buckets, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(report.written, 2);
        assert_eq!(report.failed_keys, vec![buckets[1].key]);
        assert!(!report.is_complete());
        assert_eq!(repo.summary_count(), 2);
    }

    #[tokio::test]
    async fn test_rows_outside_input_are_kept() {
        let repo = LocalRepository::new();
        sync_buckets(&repo, &[bucket(Weekday::Sat, 12, 7)], Duration::from_secs(5))
            .await
            .unwrap();
        sync_buckets(&repo, &[bucket(Weekday::Sun, 12, 9)], Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(repo.summary_count(), 2);
    }
}
