//! In-memory local repository implementation.
//!
//! Stores samples and summary rows in memory, suitable for unit tests and
//! local development. Failure injection hooks let tests drive the degraded
//! and unavailable paths of the history cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::*;
use crate::models::{BucketKey, NewSample, RawSample, SampleId, SummaryBucket};

/// In-memory local repository.
///
/// Cloning shares the underlying storage, so a test can keep a handle while
/// the pipeline owns another.
///
/// # Example
/// ```
/// use pool_history::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.sample_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    samples: Vec<RawSample>,
    summary: BTreeMap<BucketKey, SummaryBucket>,

    // Failure injection
    is_healthy: bool,
    fail_fetch: bool,
    failing_keys: HashSet<BucketKey>,
    latency: Option<Duration>,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            summary: BTreeMap::new(),
            is_healthy: true,
            fail_fetch: false,
            failing_keys: HashSet::new(),
            latency: None,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading with a caller-chosen id, bypassing any validation.
    ///
    /// Lets tests seed malformed rows the way a faulty ingestion write would.
    pub fn insert_raw_sample(&self, sample: RawSample) {
        self.data.write().samples.push(sample);
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Make `fetch_samples` fail with a query error.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.data.write().fail_fetch = fail;
    }

    /// Make upserts for `key` fail with a query error.
    pub fn fail_writes_for(&self, key: BucketKey) {
        self.data.write().failing_keys.insert(key);
    }

    /// Delay every operation, for exercising store timeouts.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.data.write().latency = latency;
    }

    /// Clear stored data. Failure injection settings are kept.
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.samples.clear();
        data.summary.clear();
    }

    /// Get the number of samples stored.
    pub fn sample_count(&self) -> usize {
        self.data.read().samples.len()
    }

    /// Get the number of summary rows stored.
    pub fn summary_count(&self) -> usize {
        self.data.read().summary.len()
    }

    /// Snapshot of the summary table in key order.
    pub fn summary_snapshot(&self) -> Vec<SummaryBucket> {
        self.data.read().summary.values().copied().collect()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let latency = self.data.read().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RepositoryHealth for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.simulate_latency().await;
        Ok(self.data.read().is_healthy)
    }
}

#[async_trait]
impl SampleRepository for LocalRepository {
    async fn insert_sample(&self, sample: &NewSample) -> RepositoryResult<SampleId> {
        self.simulate_latency().await;
        self.check_health("insert_sample")?;

        let id = SampleId::generate();
        self.data.write().samples.push(RawSample {
            id,
            timestamp: sample.timestamp,
            readings: sample.readings,
        });
        Ok(id)
    }

    async fn fetch_samples(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<RawSample>> {
        self.simulate_latency().await;
        self.check_health("fetch_samples")?;

        let data = self.data.read();
        if data.fail_fetch {
            return Err(RepositoryError::query_with_context(
                "Injected fetch failure",
                ErrorContext::new("fetch_samples").with_entity("sample"),
            ));
        }

        let mut rows: Vec<RawSample> = data
            .samples
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.timestamp);
        Ok(rows)
    }
}

#[async_trait]
impl SummaryRepository for LocalRepository {
    async fn upsert_summary_bucket(&self, bucket: &SummaryBucket) -> RepositoryResult<()> {
        self.simulate_latency().await;
        self.check_health("upsert_summary_bucket")?;

        let mut data = self.data.write();
        if data.failing_keys.contains(&bucket.key) {
            return Err(RepositoryError::query_with_context(
                "Injected write failure",
                ErrorContext::new("upsert_summary_bucket")
                    .with_entity("summary")
                    .with_entity_id(bucket.key),
            ));
        }
        data.summary.insert(bucket.key, *bucket);
        Ok(())
    }

    async fn get_summary(&self, key: BucketKey) -> RepositoryResult<Option<SummaryBucket>> {
        self.simulate_latency().await;
        self.check_health("get_summary")?;
        Ok(self.data.read().summary.get(&key).copied())
    }

    async fn get_summary_for_weekday(
        &self,
        weekday: Weekday,
    ) -> RepositoryResult<Vec<SummaryBucket>> {
        self.simulate_latency().await;
        self.check_health("get_summary_for_weekday")?;
        Ok(self
            .data
            .read()
            .summary
            .values()
            .filter(|b| b.key.weekday == weekday)
            .copied()
            .collect())
    }

    async fn list_summary(&self) -> RepositoryResult<Vec<SummaryBucket>> {
        self.simulate_latency().await;
        self.check_health("list_summary")?;
        Ok(self.data.read().summary.values().copied().collect())
    }
}
