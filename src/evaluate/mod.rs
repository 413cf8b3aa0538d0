//! Backtest evaluation.
//!
//! Responsibilities:
//!
//! - size cross-validation windows from the history span
//! - refit on rolling origins and score each 24-hour horizon
//! - aggregate fold errors into per-horizon metrics

pub mod cross_validation;
pub mod metrics;
pub mod windows;

pub use cross_validation::*;
pub use metrics::*;
pub use windows::*;
