//! Postgres repository tests. Skipped unless `DATABASE_URL` points at a
//! disposable database.

#![cfg(feature = "postgres-repo")]

mod support;

use chrono::{NaiveTime, Weekday};
use pool_history::db::repositories::{PostgresConfig, PostgresRepository};
use pool_history::db::{RepositoryHealth, SampleRepository, SummaryRepository};
use pool_history::models::{BucketKey, NewSample, SeriesValues, SummaryBucket};
use support::july;

fn repository() -> Option<PostgresRepository> {
    let config = PostgresConfig::from_env().ok()?;
    match PostgresRepository::new(config) {
        Ok(repo) => Some(repo),
        Err(e) => panic!("DATABASE_URL is set but the repository failed to start: {}", e),
    }
}

#[tokio::test]
async fn test_postgres_health_and_roundtrip() {
    let Some(repo) = tokio::task::spawn_blocking(repository).await.unwrap() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    assert!(repo.health_check().await.unwrap());

    let stamp = july(2, 12, 0);
    let id = repo
        .insert_sample(&NewSample::new(stamp, 1, 2, 3, 4))
        .await
        .unwrap();
    let rows = repo.fetch_samples(stamp, stamp).await.unwrap();
    assert!(rows.iter().any(|r| r.id == id));

    let key = BucketKey::new(Weekday::Tue, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    repo.upsert_summary_bucket(&SummaryBucket::new(key, SeriesValues::new(1, 1, 1, 1)))
        .await
        .unwrap();
    repo.upsert_summary_bucket(&SummaryBucket::new(key, SeriesValues::new(5, 6, 7, 8)))
        .await
        .unwrap();

    let row = repo.get_summary(key).await.unwrap().unwrap();
    assert_eq!(row.averages, SeriesValues::new(5, 6, 7, 8));
    assert!(repo.get_pool_stats().total_queries > 0);
}
