//! Penalized least squares solver.
//!
//! The forecasting model is linear in its coefficients, so fitting reduces to:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2 + Σ λ_j β_j^2
//! ```
//!
//! Implementation choices:
//! - The ridge term is folded in by appending `sqrt(λ_j) e_j` rows to the design
//!   matrix (and zeros to `y`), so one SVD solve handles both parts.
//! - We use SVD rather than normal equations because seasonal and dummy columns
//!   can be nearly collinear on short histories.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve least squares with a per-coefficient ridge penalty.
///
/// `penalties` must have one entry per column of `x`; zero means unpenalized.
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalties: &[f64]) -> Option<DVector<f64>> {
    let (n, p) = x.shape();
    if penalties.len() != p || y.len() != n {
        return None;
    }

    let penalized: Vec<(usize, f64)> = penalties
        .iter()
        .enumerate()
        .filter(|&(_, &l)| l > 0.0)
        .map(|(j, &l)| (j, l.sqrt()))
        .collect();

    let rows = n + penalized.len();
    let mut xa = DMatrix::<f64>::zeros(rows, p);
    xa.view_mut((0, 0), (n, p)).copy_from(x);
    for (k, &(j, s)) in penalized.iter().enumerate() {
        xa[(n + k, j)] = s;
    }

    let mut ya = DVector::<f64>::zeros(rows);
    ya.rows_mut(0, n).copy_from(y);

    solve_least_squares(&xa, &ya)
}
