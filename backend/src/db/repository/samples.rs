//! Raw sample storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use super::RepositoryHealth;
use crate::models::{NewSample, RawSample, SampleId};

/// Repository trait for the raw occupancy readings.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait SampleRepository: RepositoryHealth {
    /// Store a new reading.
    ///
    /// # Returns
    /// * `Ok(SampleId)` - Identifier assigned by the store
    /// * `Err(RepositoryError)` - If the write fails
    async fn insert_sample(&self, sample: &NewSample) -> RepositoryResult<SampleId>;

    /// Fetch every reading with `start <= timestamp <= end`, ordered by
    /// timestamp ascending.
    ///
    /// An empty range yields `Ok(vec![])`, never an error.
    async fn fetch_samples(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<RawSample>>;
}
