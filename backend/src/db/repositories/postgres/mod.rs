//! Postgres repository implementation using Diesel.
//!
//! Two tables back the repository: `pool_samples` holds raw readings and
//! `pool_summary` holds one row per (weekday, time of day) bucket.
//!
//! ## Features
//!
//! - Connection pooling with r2d2; every operation checks a connection out
//!   and returns it on completion, success or failure
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ErrorContext, RepositoryError, RepositoryHealth, RepositoryResult, SampleRepository,
    SummaryRepository,
};
use crate::models::{BucketKey, NewSample, RawSample, SampleId, SummaryBucket};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of idle connections kept open
    pub min_pool_size: u32,
    /// Connection checkout timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    /// Total queries attempted
    pub total_queries: u64,
    /// Operations that failed after exhausting retries
    pub failed_queries: u64,
    pub retried_operations: u64,
}

#[derive(Debug, Default)]
struct QueryCounters {
    total: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    counters: Arc<QueryCounters>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConnectionError)` if the pool cannot be built
    /// * `Err(RepositoryError::InternalError)` if a migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                RepositoryError::internal_with_context(
                    format!("Migration failed: {}", e),
                    ErrorContext::new("run_migrations"),
                )
            })?;
        }

        log::info!(
            "Postgres repository ready (pool max={}, min idle={})",
            config.max_pool_size,
            config.min_pool_size
        );

        Ok(Self {
            pool,
            config,
            counters: Arc::new(QueryCounters::default()),
        })
    }

    /// Run `f` on a pooled connection inside the blocking thread pool.
    ///
    /// The connection is checked out per attempt and dropped back into the
    /// pool when the attempt ends. Retryable failures back off exponentially
    /// up to `max_retries` times.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let counters = self.counters.clone();

        task::spawn_blocking(move || {
            let mut attempt = 0;
            loop {
                let result = match pool.get() {
                    Ok(mut conn) => {
                        counters.total.fetch_add(1, Ordering::Relaxed);
                        f.clone()(&mut conn)
                    }
                    Err(e) => Err(RepositoryError::connection_with_context(
                        e.to_string(),
                        ErrorContext::new(operation)
                            .with_details(format!("attempt={}", attempt + 1)),
                    )),
                };

                match result {
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        attempt += 1;
                        counters.retried.fetch_add(1, Ordering::Relaxed);
                        log::warn!(
                            "{} failed (attempt {}/{}), retrying in {:?}: {}",
                            operation,
                            attempt,
                            max_retries + 1,
                            delay,
                            e
                        );
                        std::thread::sleep(delay);
                        delay *= 2;
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        return Err(e.with_operation(operation));
                    }
                    Ok(value) => return Ok(value),
                }
            }
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new(operation).with_details("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.counters.total.load(Ordering::Relaxed),
            failed_queries: self.counters.failed.load(Ordering::Relaxed),
            retried_operations: self.counters.retried.load(Ordering::Relaxed),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn rows_to_buckets(rows: Vec<SummaryRow>) -> RepositoryResult<Vec<SummaryBucket>> {
    rows.into_iter().map(SummaryBucket::try_from).collect()
}

#[async_trait]
impl RepositoryHealth for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }
}

#[async_trait]
impl SampleRepository for PostgresRepository {
    async fn insert_sample(&self, sample: &NewSample) -> RepositoryResult<SampleId> {
        let id = SampleId::generate();
        let row = NewSampleRow::from_sample(id, sample);

        self.with_conn("insert_sample", move |conn| {
            diesel::insert_into(pool_samples::table)
                .values(&row)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(id)
        })
        .await
    }

    async fn fetch_samples(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<RawSample>> {
        self.with_conn("fetch_samples", move |conn| {
            let rows: Vec<SampleRow> = pool_samples::table
                .filter(pool_samples::recorded_at.ge(start))
                .filter(pool_samples::recorded_at.le(end))
                .order(pool_samples::recorded_at.asc())
                .select(SampleRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(RawSample::from).collect())
        })
        .await
    }
}

#[async_trait]
impl SummaryRepository for PostgresRepository {
    async fn upsert_summary_bucket(&self, bucket: &SummaryBucket) -> RepositoryResult<()> {
        let row = SummaryUpsertRow::from_bucket(bucket, Utc::now())?;
        let key = bucket.key;

        self.with_conn("upsert_summary_bucket", move |conn| {
            diesel::insert_into(pool_summary::table)
                .values(&row)
                .on_conflict((pool_summary::weekday, pool_summary::time_of_day))
                .do_update()
                .set((
                    pool_summary::sport_avg.eq(excluded(pool_summary::sport_avg)),
                    pool_summary::family_avg.eq(excluded(pool_summary::family_avg)),
                    pool_summary::small_avg.eq(excluded(pool_summary::small_avg)),
                    pool_summary::ice_avg.eq(excluded(pool_summary::ice_avg)),
                    pool_summary::updated_at.eq(excluded(pool_summary::updated_at)),
                ))
                .execute(conn)
                .map_err(|e| {
                    let err = map_diesel_error(e);
                    log::debug!("Upsert failed for bucket {}: {}", key, err);
                    err
                })?;
            Ok(())
        })
        .await
    }

    async fn get_summary(&self, key: BucketKey) -> RepositoryResult<Option<SummaryBucket>> {
        let weekday = weekday_to_db(key.weekday);

        self.with_conn("get_summary", move |conn| {
            let row: Option<SummaryRow> = pool_summary::table
                .filter(pool_summary::weekday.eq(weekday))
                .filter(pool_summary::time_of_day.eq(key.time_of_day))
                .select(SummaryRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.map(SummaryBucket::try_from).transpose()
        })
        .await
    }

    async fn get_summary_for_weekday(
        &self,
        weekday: Weekday,
    ) -> RepositoryResult<Vec<SummaryBucket>> {
        let weekday = weekday_to_db(weekday);

        self.with_conn("get_summary_for_weekday", move |conn| {
            let rows: Vec<SummaryRow> = pool_summary::table
                .filter(pool_summary::weekday.eq(weekday))
                .order(pool_summary::time_of_day.asc())
                .select(SummaryRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows_to_buckets(rows)
        })
        .await
    }

    async fn list_summary(&self) -> RepositoryResult<Vec<SummaryBucket>> {
        self.with_conn("list_summary", |conn| {
            let rows: Vec<SummaryRow> = pool_summary::table
                .order((pool_summary::weekday.asc(), pool_summary::time_of_day.asc()))
                .select(SummaryRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows_to_buckets(rows)
        })
        .await
    }
}
