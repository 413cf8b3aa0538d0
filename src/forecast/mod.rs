//! Future-horizon synthesis and forecast extraction.

pub mod future;

pub use future::*;

use crate::domain::ForecastPoint;

/// The last `horizon` rows of a scored sequence, ascending by timestamp.
///
/// Scored sequences may include in-sample rows; only the trailing horizon is
/// a genuine forecast.
pub fn extract_horizon(points: &[ForecastPoint], horizon: usize) -> Vec<ForecastPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.ds);
    let start = sorted.len().saturating_sub(horizon);
    sorted.split_off(start)
}
