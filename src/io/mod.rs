//! Input/output helpers.
//!
//! - raw extract discovery (`discover`)
//! - raw extract parsing + consolidation (`ingest`)
//! - consolidated table read/write (`processed`)
//! - forecast CSV (`export`)
//! - evaluation JSON (`report`)

pub mod discover;
pub mod export;
pub mod ingest;
pub mod processed;
pub mod report;

pub use discover::*;
pub use export::*;
pub use ingest::*;
pub use processed::*;
pub use report::*;

/// Timestamp used to name artifacts written by one run.
pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
