//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical column schema of the consolidated series
//! - stage configurations (`IngestConfig`, `ForecastConfig`, `FetchConfig`, `SampleConfig`)
//! - the consolidated observation table and forecast rows

pub mod types;

pub use types::*;
