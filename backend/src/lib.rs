//! # Pool occupancy history
//!
//! Aggregates raw occupancy readings of four recreation facilities (sports
//! pool, family pool, small pool, ice rink) into a weekday × time-of-day
//! table of average occupancy.
//!
//! ## Architecture
//!
//! - [`models`]: samples, series and summary buckets
//! - [`db`]: repository traits, the in-memory and Postgres backends, and
//!   configuration loading
//! - [`services`]: the history pipeline (fetch → clean → average → sync)
//!
//! A cycle is run with [`services::HistoryPipeline::run_cycle`], normally
//! from the `pool-history` binary under an external scheduler.

// RepositoryError carries rich context for debugging
#![allow(clippy::result_large_err)]

pub mod db;
pub mod models;
pub mod services;
