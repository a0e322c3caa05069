#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use pool_history::db::repositories::LocalRepository;
use pool_history::db::SampleRepository;
use pool_history::models::NewSample;
use pool_history::services::PipelineConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores variables on unwind and serializes access to the process-global
/// environment so parallel tests do not observe each other's changes.
///
/// `Some(v)` sets the variable, `None` removes it.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// A UTC instant in July 2024. July 1st is a Monday.
pub fn july(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, day, hour, minute, 0).unwrap()
}

/// Cycle clock used by most tests: Tuesday 2024-07-23 00:05 UTC.
pub fn cycle_clock() -> DateTime<Utc> {
    july(23, 0, 5)
}

/// Default pipeline settings with UTC as the facility zone, so stored
/// timestamps and local times coincide.
pub fn utc_config() -> PipelineConfig {
    PipelineConfig {
        timezone: chrono_tz::UTC,
        ..Default::default()
    }
}

/// Insert `(timestamp, [sport, family, small, ice])` readings.
pub async fn seed(repo: &LocalRepository, rows: &[(DateTime<Utc>, [i32; 4])]) {
    for (ts, [sport, family, small, ice]) in rows {
        repo.insert_sample(&NewSample::new(*ts, *sport, *family, *small, *ice))
            .await
            .unwrap();
    }
}
