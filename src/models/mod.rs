//! Additive model building blocks.
//!
//! The model is implemented as small, pure functions over a `DesignLayout` so
//! that fitting, forecasting and backtesting share one definition of a row.

pub mod model;

pub use model::*;
