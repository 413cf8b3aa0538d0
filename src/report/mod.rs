//! Terminal reporting for each pipeline stage.

pub mod format;

pub use format::*;
