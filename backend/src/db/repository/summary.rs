//! Summary table storage.

use async_trait::async_trait;
use chrono::Weekday;

use super::error::RepositoryResult;
use super::RepositoryHealth;
use crate::models::{BucketKey, SummaryBucket};

/// Repository trait for the weekday × time-of-day summary table.
///
/// The table holds at most one row per [`BucketKey`]; writes are upserts.
#[async_trait]
pub trait SummaryRepository: RepositoryHealth {
    /// Insert the bucket, or replace the averages of the existing row with
    /// the same key.
    async fn upsert_summary_bucket(&self, bucket: &SummaryBucket) -> RepositoryResult<()>;

    /// Get a single row by key.
    ///
    /// # Returns
    /// * `Ok(None)` - If no row exists for the key
    async fn get_summary(&self, key: BucketKey) -> RepositoryResult<Option<SummaryBucket>>;

    /// All rows for one weekday, ordered by time of day.
    async fn get_summary_for_weekday(
        &self,
        weekday: Weekday,
    ) -> RepositoryResult<Vec<SummaryBucket>>;

    /// Every row, ordered Monday→Sunday then by time of day.
    async fn list_summary(&self) -> RepositoryResult<Vec<SummaryBucket>>;
}
