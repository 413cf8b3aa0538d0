//! Changepoint placement.
//!
//! Potential trend changepoints are spread evenly (by observation index) over
//! the first `range` fraction of the history. Their slopes are shrunk toward
//! zero by the ridge penalty, so placing many of them is harmless.

use crate::error::AppError;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(AppError::Config(format!(
            "Invalid range: min={min}, max={max} (must be finite and max>=min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::Config("Range steps must be >= 2.".to_string()));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| min + step * i as f64).collect())
}

/// Pick changepoints from sorted scaled times `t`.
///
/// At most `n_changepoints` are placed, limited by the number of observations
/// inside the first `range` fraction of the history. The first observation is
/// never a changepoint.
pub fn place_changepoints(t: &[f64], n_changepoints: usize, range: f64) -> Result<Vec<f64>, AppError> {
    if !(range > 0.0 && range <= 1.0) {
        return Err(AppError::Config(format!("Changepoint range must be in (0, 1], got {range}.")));
    }

    let hist_size = (t.len() as f64 * range).floor() as usize;
    let n = n_changepoints.min(hist_size.saturating_sub(1));
    if n == 0 {
        return Ok(Vec::new());
    }

    let positions = linspace(0.0, (hist_size - 1) as f64, n + 1)?;
    let mut out: Vec<f64> = positions
        .into_iter()
        .skip(1)
        .map(|p| t[p.round() as usize])
        .collect();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(0.0, 10.0, 5).unwrap();
        assert_eq!(v, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
        assert!(linspace(1.0, 0.0, 3).is_err());
        assert!(linspace(0.0, 1.0, 1).is_err());
    }

    #[test]
    fn changepoints_stay_in_leading_range() {
        let t: Vec<f64> = (0..100).map(|i| i as f64 / 99.0).collect();
        let cps = place_changepoints(&t, 25, 0.8).unwrap();
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|&c| c > 0.0 && c <= 0.8));
        for w in cps.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn short_histories_get_fewer_changepoints() {
        let t = [0.0, 0.25, 0.5, 0.75, 1.0];
        // hist_size = 4 -> at most 3 changepoints.
        let cps = place_changepoints(&t, 25, 0.8).unwrap();
        assert_eq!(cps, vec![0.25, 0.5, 0.75]);
        assert!(place_changepoints(&t[..1], 25, 0.8).unwrap().is_empty());
    }
}
