//! Storage for raw occupancy samples and the derived summary table.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  History pipeline (crate::services) / ingestion caller  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                            │
//! │  - Sample validation on ingest                          │
//! │  - Summary queries and text overview                    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/)                        │
//! │  - SampleRepository / SummaryRepository                 │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                │
//! ┌───▼──────────────────┐   ┌─────────▼───────────────┐
//! │ Postgres (Diesel)    │   │ Local Repository        │
//! │ postgres-repo feature│   │ (in-memory)             │
//! └──────────────────────┘   └─────────────────────────┘
//! ```
//!
//! Repositories are created explicitly through [`RepositoryFactory`] or
//! [`RepositoryBuilder`] and passed to whoever needs them; there is no
//! process-wide instance.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

// ==================== Service Layer ====================

pub use services::{
    get_summary, get_summary_for_weekday, health_check, list_summary, record_sample,
    weekday_overview,
};

// ==================== Repository Pattern Exports ====================

pub use repo_config::{PipelineSettings, RepositoryConfig};

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, FullRepository, RepositoryError, RepositoryHealth, RepositoryResult,
    SampleRepository, SummaryRepository,
};
