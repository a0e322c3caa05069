//! History cycle orchestration.
//!
//! One cycle runs fetch → clean → average → sync against a single
//! repository. Cycles keep no state between runs and must not overlap;
//! scheduling is left to the caller (cron, a systemd timer, ...).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::averaging::average_buckets;
use super::cleaning::{clean_samples, CleaningReport};
use super::config::PipelineConfig;
use super::fetcher::fetch_recent;
use super::sync::{sync_buckets, SyncError};
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::models::BucketKey;

/// Pipeline stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Clean,
    Average,
    Sync,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Clean => "clean",
            Stage::Average => "average",
            Stage::Sync => "sync",
        };
        f.write_str(name)
    }
}

/// A cycle that could not complete. Nothing was written when the failing
/// stage is `Fetch`, nor when `Sync` failed its health check.
#[derive(Debug, thiserror::Error)]
#[error("History cycle failed at {stage} stage: {source}")]
pub struct CycleError {
    pub stage: Stage,
    #[source]
    pub source: RepositoryError,
}

impl CycleError {
    fn new(stage: Stage, source: RepositoryError) -> Self {
        Self { stage, source }
    }

    /// Whether the failure was the store being unreachable.
    pub fn is_store_unavailable(&self) -> bool {
        self.source.is_unavailable()
    }
}

impl From<SyncError> for CycleError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::StoreUnavailable(source) => CycleError::new(Stage::Sync, source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    /// Every computed bucket was written.
    Success,
    /// Nothing to aggregate; the store was not touched.
    Empty,
    /// Some buckets failed to write; see `failed_keys`.
    Degraded,
}

impl CycleStatus {
    /// Level at which a finished cycle is reported. An empty window is
    /// routine, only lost writes deserve a warning.
    pub fn log_level(self) -> log::Level {
        match self {
            CycleStatus::Success | CycleStatus::Empty => log::Level::Info,
            CycleStatus::Degraded => log::Level::Warn,
        }
    }
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleResult {
    pub status: CycleStatus,
    /// End of the sample window (the cycle clock).
    pub window_end: DateTime<Utc>,
    pub samples_fetched: usize,
    pub cleaning: CleaningReport,
    pub buckets_computed: usize,
    pub buckets_written: usize,
    pub failed_keys: Vec<BucketKey>,
    pub duration_ms: u64,
}

impl CycleResult {
    fn empty(window_end: DateTime<Utc>, samples_fetched: usize, cleaning: CleaningReport) -> Self {
        Self {
            status: CycleStatus::Empty,
            window_end,
            samples_fetched,
            cleaning,
            buckets_computed: 0,
            buckets_written: 0,
            failed_keys: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Refreshes the summary table from the trailing window of samples.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use pool_history::db::repositories::LocalRepository;
/// use pool_history::services::{HistoryPipeline, PipelineConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = HistoryPipeline::new(Arc::new(LocalRepository::new()), PipelineConfig::default())?;
/// let result = pipeline.run_cycle().await?;
/// println!("{:?}", result.status);
/// # Ok(())
/// # }
/// ```
pub struct HistoryPipeline {
    repo: Arc<dyn FullRepository>,
    config: PipelineConfig,
}

impl HistoryPipeline {
    /// Build a pipeline, rejecting invalid configuration up front.
    pub fn new(repo: Arc<dyn FullRepository>, config: PipelineConfig) -> RepositoryResult<Self> {
        config.validate()?;
        Ok(Self { repo, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repo
    }

    /// Run one cycle against the current wall clock.
    pub async fn run_cycle(&self) -> Result<CycleResult, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle with `now` as the end of the sample window.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleResult, CycleError> {
        let timer = Instant::now();
        let result = self.execute(now).await;
        let elapsed = timer.elapsed().as_millis() as u64;

        match result {
            Ok(mut result) => {
                result.duration_ms = elapsed;
                let summary = match result.status {
                    CycleStatus::Success => format!(
                        "History cycle complete: {} samples, {} buckets written in {} ms",
                        result.samples_fetched, result.buckets_written, elapsed
                    ),
                    CycleStatus::Empty => "History cycle: nothing to do".to_string(),
                    CycleStatus::Degraded => format!(
                        "History cycle degraded: {} of {} buckets failed to write",
                        result.failed_keys.len(),
                        result.buckets_computed
                    ),
                };
                log::log!(result.status.log_level(), "{}", summary);
                Ok(result)
            }
            Err(err) => {
                log::error!("{}", err);
                Err(err)
            }
        }
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<CycleResult, CycleError> {
        let config = &self.config;
        let repo = self.repo.as_ref();

        let samples = fetch_recent(repo, config.window_days, now, config.store_timeout)
            .await
            .map_err(|e| CycleError::new(Stage::Fetch, e))?;
        log::info!(
            "[{}] {} samples in the last {} days",
            Stage::Fetch,
            samples.len(),
            config.window_days
        );

        let cleaned = clean_samples(&samples, config);
        let report = cleaned.report.clone();
        log::info!(
            "[{}] retained {} of {} (malformed={}, off_hours={}, closed_days={})",
            Stage::Clean,
            report.retained,
            report.input,
            report.malformed,
            report.off_hours,
            report.closed_days
        );
        if let (Some(first), Some(last)) = (report.first_sample, report.last_sample) {
            log::info!(
                "[{}] observed {} to {} over {} working day(s)",
                Stage::Clean,
                first,
                last,
                report.open_days
            );
        }
        if cleaned.is_empty() {
            return Ok(CycleResult::empty(now, samples.len(), report));
        }

        let buckets = average_buckets(&cleaned.samples, config.rounding);
        log::info!("[{}] {} buckets computed", Stage::Average, buckets.len());

        let sync = sync_buckets(repo, &buckets, config.store_timeout).await?;
        log::info!(
            "[{}] {} written, {} failed",
            Stage::Sync,
            sync.written,
            sync.failed_keys.len()
        );

        let status = if sync.is_complete() {
            CycleStatus::Success
        } else {
            CycleStatus::Degraded
        };

        Ok(CycleResult {
            status,
            window_end: now,
            samples_fetched: samples.len(),
            cleaning: report,
            buckets_computed: buckets.len(),
            buckets_written: sync.written,
            failed_keys: sync.failed_keys,
            duration_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cycle_is_not_reported_as_a_problem() {
        assert_eq!(CycleStatus::Empty.log_level(), log::Level::Info);
        assert_eq!(CycleStatus::Success.log_level(), log::Level::Info);
        assert_eq!(CycleStatus::Degraded.log_level(), log::Level::Warn);
    }
}
