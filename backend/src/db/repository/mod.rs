//! Repository trait definitions for occupancy storage.
//!
//! Storage is split into two focused traits so that the ingestion path and
//! the aggregation path can be mocked independently:
//!
//! - [`samples`]: raw readings written every scrape and read back by the cycle
//! - [`summary`]: the weekday × time-of-day table consumed by charts
//!
//! Both share [`RepositoryHealth`] as a supertrait, so a single
//! `health_check` call answers for the whole store.
//!
//! ```ignore
//! async fn refresh<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let samples = repo.fetch_samples(start, end).await?;
//!     repo.upsert_summary_bucket(&bucket).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod samples;
pub mod summary;

use async_trait::async_trait;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use samples::SampleRepository;
pub use summary::SummaryRepository;

/// Connection health shared by every repository trait.
#[async_trait]
pub trait RepositoryHealth: Send + Sync {
    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store accepts operations
    /// - `Ok(false)` if it is reachable but refusing work
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;
}

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type implementing both data traits.
pub trait FullRepository: SampleRepository + SummaryRepository {}

impl<T> FullRepository for T where T: SampleRepository + SummaryRepository {}
