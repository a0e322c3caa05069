//! Averaging of cleaned samples into summary buckets.

use std::collections::HashMap;

use super::config::RoundingMode;
use crate::models::{BucketKey, CleanedSample, SeriesValues, SummaryBucket};

#[derive(Debug, Default)]
struct BucketAccumulator {
    count: u64,
    sums: [u64; 4],
}

impl BucketAccumulator {
    fn add(&mut self, counts: &SeriesValues<u32>) {
        self.count += 1;
        for (sum, value) in self.sums.iter_mut().zip(counts.to_array()) {
            *sum += u64::from(value);
        }
    }

    fn finish(&self, rounding: RoundingMode) -> SeriesValues<u32> {
        // Means of u32 values always fit back into u32.
        let mean = |sum: u64| u32::try_from(rounding.divide(sum, self.count)).unwrap_or(u32::MAX);
        SeriesValues::from_array(self.sums.map(mean))
    }
}

/// Group samples by (weekday, time of day) and average every series.
///
/// Exactly one bucket is produced per key that has at least one sample.
/// The result is sorted Monday→Sunday, then by time of day, and depends
/// only on the multiset of samples, not their order.
pub fn average_buckets(samples: &[CleanedSample], rounding: RoundingMode) -> Vec<SummaryBucket> {
    let mut groups: HashMap<BucketKey, BucketAccumulator> = HashMap::new();
    for sample in samples {
        groups
            .entry(BucketKey::new(sample.weekday, sample.time_of_day))
            .or_default()
            .add(&sample.counts);
    }

    let mut buckets: Vec<SummaryBucket> = groups
        .into_iter()
        .map(|(key, acc)| SummaryBucket::new(key, acc.finish(rounding)))
        .collect();
    buckets.sort_by_key(|b| b.key);

    log::debug!("Averaged {} samples into {} buckets", samples.len(), buckets.len());
    buckets
}
