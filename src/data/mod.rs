//! Raw extract sources: the monitoring-network API and a synthetic generator.

pub mod sample;
pub mod soramame;
