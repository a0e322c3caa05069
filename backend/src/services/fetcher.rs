//! Sample fetcher: reads the trailing window of raw samples.

use chrono::{DateTime, Duration as WindowDuration, Utc};
use std::time::Duration;

use super::bounded;
use crate::db::repository::{RepositoryResult, SampleRepository};
use crate::models::RawSample;

/// Inclusive `[now - window_days, now]` range.
pub fn window_bounds(window_days: u32, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - WindowDuration::days(i64::from(window_days)), now)
}

/// Fetch every sample in the trailing window, oldest first.
///
/// An empty window is `Ok(vec![])`. A store failure or an elapsed
/// `timeout` is returned as-is; callers classify it.
pub async fn fetch_recent<R>(
    repo: &R,
    window_days: u32,
    now: DateTime<Utc>,
    timeout: Duration,
) -> RepositoryResult<Vec<RawSample>>
where
    R: SampleRepository + ?Sized,
{
    let (start, end) = window_bounds(window_days, now);
    log::debug!("Fetching samples from {} to {}", start, end);

    let mut samples = bounded(timeout, "fetch_samples", repo.fetch_samples(start, end)).await?;

    // Backends promise ascending order; keep the invariant even if one slips.
    if !samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        samples.sort_by_key(|s| s.timestamp);
    }
    Ok(samples)
}
