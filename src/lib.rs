//! `aq-forecast` library crate.
//!
//! The binary (`aq`) is a thin wrapper around this library so that:
//!
//! - the consolidation and forecasting stages are testable without spawning processes
//! - each stage can be driven on its own (ingest only, forecast from a processed file)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod fit;
pub mod forecast;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod store;
