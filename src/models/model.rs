//! Design-row construction for the additive model.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a timestamp and its regressor values (for least squares)
//! - evaluate `x^T β` for that row (for fitted values and forecasts)
//!
//! Column layout of a design row:
//!
//! ```text
//! [1, t, (t - c_1)+, ..., (t - c_m)+, fourier(s_1)..., fourier(s_k)..., z_1, ..., z_r]
//! ```
//!
//! where `t` is time scaled to `[0, 1]` over the training history, `c_j` are the
//! changepoints on the same scale, and `z_j` are the standardized regressors.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::math::{fourier_terms, hinge};

/// Which additive component a coefficient belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Intercept,
    Trend,
    Changepoint,
    Seasonal,
    Regressor,
}

/// One Fourier seasonality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalTerm {
    pub name: String,
    pub period_days: f64,
    pub order: usize,
}

/// Standardization of one regressor column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressorScaling {
    pub name: String,
    pub mean: f64,
    pub std: f64,
}

impl RegressorScaling {
    pub fn apply(&self, v: f64) -> f64 {
        (v - self.mean) / self.std
    }
}

/// Everything needed to turn `(timestamp, regressors)` into a design row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignLayout {
    /// Start of the training history, in days since the Unix epoch.
    pub t0_days: f64,
    /// Length of the training history, in days.
    pub t_scale_days: f64,
    /// Changepoints on the scaled time axis.
    pub changepoints: Vec<f64>,
    pub seasonalities: Vec<SeasonalTerm>,
    pub regressors: Vec<RegressorScaling>,
}

impl DesignLayout {
    pub fn width(&self) -> usize {
        2 + self.changepoints.len()
            + self.seasonalities.iter().map(|s| 2 * s.order).sum::<usize>()
            + self.regressors.len()
    }

    /// Component of every column, in layout order.
    pub fn components(&self) -> Vec<Component> {
        let mut out = vec![Component::Intercept, Component::Trend];
        out.extend(std::iter::repeat_n(Component::Changepoint, self.changepoints.len()));
        for s in &self.seasonalities {
            out.extend(std::iter::repeat_n(Component::Seasonal, 2 * s.order));
        }
        out.extend(std::iter::repeat_n(Component::Regressor, self.regressors.len()));
        out
    }

    pub fn scaled_time(&self, t_days: f64) -> f64 {
        (t_days - self.t0_days) / self.t_scale_days
    }

    /// Build the design row for one timestamp.
    ///
    /// `regressors` must be in schema order, one value per `self.regressors`.
    pub fn design_row(&self, ts: NaiveDateTime, regressors: &[f64]) -> Vec<f64> {
        let t_days = days_since_epoch(ts);
        let t = self.scaled_time(t_days);

        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|&c| hinge(t, c)));
        for s in &self.seasonalities {
            fourier_terms(t_days, s.period_days, s.order, &mut row);
        }
        row.extend(self.regressors.iter().zip(regressors).map(|(sc, &v)| sc.apply(v)));
        row
    }
}

/// Fractional days since 1970-01-01 00:00.
pub fn days_since_epoch(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp() as f64 / 86_400.0
}

pub fn dot(row: &[f64], beta: &[f64]) -> f64 {
    row.iter().zip(beta).map(|(x, b)| x * b).sum()
}
