//! History cycle binary.
//!
//! Runs one aggregation cycle and exits. Scheduling (daily, shortly after
//! midnight) is left to cron or a systemd timer.
//!
//! # Usage
//!
//! ```bash
//! # In-memory repository with default pipeline settings
//! cargo run --bin pool-history
//!
//! # Settings from a file
//! cargo run --bin pool-history --features postgres-repo -- repository.toml
//! POOL_HISTORY_CONFIG=/etc/pool-history/repository.toml pool-history
//! ```
//!
//! # Environment Variables
//!
//! - `POOL_HISTORY_CONFIG`: path to `repository.toml` when no argument is given
//! - `REPOSITORY_TYPE`, `DATABASE_URL`, `PG_*`: repository selection when no
//!   file is given and no `repository.toml` sits in `.`, `backend/` or `..`
//! - `RUST_LOG`: log filter (default: info)

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pool_history::db::{RepositoryConfig, RepositoryFactory};
use pool_history::services::{HistoryPipeline, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config_path = env::args_os()
        .nth(1)
        .or_else(|| env::var_os("POOL_HISTORY_CONFIG"))
        .map(PathBuf::from)
        .or_else(RepositoryConfig::default_location);

    let (repository, pipeline_config) = match config_path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let config = RepositoryConfig::from_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let repository = RepositoryFactory::from_repository_config(&config).await?;
            (repository, config.pipeline_config()?)
        }
        None => {
            info!("No configuration file given; using environment and defaults");
            (RepositoryFactory::from_env().await?, PipelineConfig::default())
        }
    };

    let pipeline = HistoryPipeline::new(repository, pipeline_config)?;
    info!(
        window_days = pipeline.config().window_days,
        timezone = pipeline.config().timezone.name(),
        rounding = %pipeline.config().rounding,
        "Starting history cycle"
    );

    match pipeline.run_cycle().await {
        Ok(result) => {
            info!("Cycle outcome: {}", serde_json::to_string(&result)?);
            Ok(())
        }
        Err(err) => {
            error!(stage = %err.stage, store_unavailable = err.is_store_unavailable(), "{}", err);
            Err(err.into())
        }
    }
}
