//! Basis functions for the additive model.
//!
//! - Fourier terms: `sin(2πkt/P)`, `cos(2πkt/P)` for `k = 1..=order`
//! - Changepoint hinge: `max(t - c, 0)`, the slope change after changepoint `c`
//!
//! `t` is measured in days for seasonal terms so that periods read naturally
//! (1 = daily, 7 = weekly, 365.25 = yearly).

use std::f64::consts::TAU;

/// Append `2 * order` Fourier terms for time `t_days` and period `period_days`.
///
/// Layout: `[sin(1), cos(1), sin(2), cos(2), ...]`.
pub fn fourier_terms(t_days: f64, period_days: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let x = TAU * k as f64 * t_days / period_days;
        out.push(x.sin());
        out.push(x.cos());
    }
}

/// Slope-change hinge for a changepoint at `c`.
pub fn hinge(t: f64, c: f64) -> f64 {
    (t - c).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourier_terms_repeat_every_period() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        fourier_terms(0.3, 7.0, 3, &mut a);
        fourier_terms(7.3, 7.0, 3, &mut b);
        assert_eq!(a.len(), 6);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn fourier_terms_at_zero() {
        let mut v = Vec::new();
        fourier_terms(0.0, 1.0, 2, &mut v);
        assert_eq!(v, vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn hinge_is_zero_before_changepoint() {
        assert_eq!(hinge(0.2, 0.5), 0.0);
        assert!((hinge(0.75, 0.5) - 0.25).abs() < 1e-12);
    }
}
