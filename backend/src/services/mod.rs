//! Service layer: the history aggregation pipeline.
//!
//! Stages live in their own modules and are plain functions over a
//! repository reference; [`HistoryPipeline`] strings them together.

pub mod averaging;
pub mod cleaning;
pub mod config;
pub mod fetcher;
pub mod pipeline;
pub mod sync;

pub use averaging::average_buckets;
pub use cleaning::{clean_samples, CleaningOutcome, CleaningReport};
pub use config::{PipelineConfig, RoundingMode};
pub use fetcher::fetch_recent;
pub use pipeline::{CycleError, CycleResult, CycleStatus, HistoryPipeline, Stage};
pub use sync::{sync_buckets, SyncError, SyncReport};

use std::future::Future;
use std::time::Duration;

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

/// Await a store call, failing with a timeout error once `limit` elapses.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::timeout_with_context(
            format!("Store call exceeded {:?}", limit),
            ErrorContext::new(operation),
        )),
    }
}
