//! Distribution helpers.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::AppError;

/// Standard normal quantile `Φ⁻¹(p)` for `p` in (0, 1).
pub fn normal_quantile(p: f64) -> Result<f64, AppError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(AppError::Config(format!("Quantile level must be in (0, 1), got {p}.")));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::Config(format!("Normal distribution error: {e}")))?;
    Ok(normal.inverse_cdf(p))
}

/// Two-sided z-score for a central interval of the given coverage.
pub fn interval_z(width: f64) -> Result<f64, AppError> {
    if !(width > 0.0 && width < 1.0) {
        return Err(AppError::Config(format!("Interval width must be in (0, 1), got {width}.")));
    }
    normal_quantile((1.0 + width) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_scores_match_tables() {
        assert!((interval_z(0.8).unwrap() - 1.281_551_565_5).abs() < 1e-6);
        assert!((interval_z(0.95).unwrap() - 1.959_963_985).abs() < 1e-6);
        assert!(normal_quantile(0.5).unwrap().abs() < 1e-9);
    }

    #[test]
    fn out_of_range_levels_are_rejected() {
        assert!(interval_z(0.0).is_err());
        assert!(interval_z(1.0).is_err());
        assert!(normal_quantile(1.0).is_err());
    }
}
