//! Gap filling for numeric regressors.
//!
//! The fill policy is applied in a fixed order:
//!
//! 1. linear interpolation between observed neighbours (by row position)
//! 2. forward fill of trailing gaps
//! 3. backward fill of leading gaps
//!
//! A column with at least one observed value therefore ends up with no gaps.
//! A fully missing column stays fully missing; callers drop such columns first.

/// Fraction of missing cells. An empty column counts as fully missing.
pub fn missing_ratio(values: &[Option<f64>]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    count_missing(values) as f64 / values.len() as f64
}

pub fn count_missing(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_none()).count()
}

/// Fill interior gaps by linear interpolation over row position.
pub fn interpolate_linear(values: &mut [Option<f64>]) {
    let mut prev: Option<(usize, f64)> = None;
    for i in 0..values.len() {
        let Some(v) = values[i] else { continue };
        if let Some((j, pv)) = prev {
            let gap = i - j;
            for k in 1..gap {
                let u = k as f64 / gap as f64;
                values[j + k] = Some(pv + u * (v - pv));
            }
        }
        prev = Some((i, v));
    }
}

pub fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for v in values.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None => *v = last,
        }
    }
}

pub fn backward_fill(values: &mut [Option<f64>]) {
    let mut next = None;
    for v in values.iter_mut().rev() {
        match v {
            Some(x) => next = Some(*x),
            None => *v = next,
        }
    }
}

/// Apply the full fill policy (interpolate, forward fill, backward fill).
pub fn fill_gaps(mut values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    interpolate_linear(&mut values);
    forward_fill(&mut values);
    backward_fill(&mut values);
    values
}
