//! Batch fitting of the additive trend + seasonality + regressor model.
//!
//! Fitting is the model's constructor: one penalized least squares solve over
//! every row with an observed target. Coefficient penalties play the role of
//! priors, `λ = (σ_ref / prior_scale)²`, with the target scaled by its
//! absolute maximum so one reference noise level fits all series.
//!
//! Intervals are `yhat ± z·σ`, where `σ` is the in-sample residual RMSE and `z`
//! the normal quantile for the configured coverage.

use chrono::NaiveDateTime;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::domain::{ForecastPoint, ModelConfig};
use crate::error::AppError;
use crate::features::{FeatureFrame, FrozenSchema, RegressorMatrix};
use crate::fit::changepoints::place_changepoints;
use crate::fit::seasonality::select_seasonalities;
use crate::math::{interval_z, solve_ridge};
use crate::models::{Component, DesignLayout, RegressorScaling, days_since_epoch, dot};

/// Residual scale (in scaled target units) the prior scales are expressed against.
const NOISE_REF: f64 = 0.1;
/// Prior scale of the intercept and base growth rate.
const BASE_PRIOR_SCALE: f64 = 5.0;
const MIN_OBSERVED: usize = 2;

/// In-sample fit statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    pub n_rows: usize,
    pub n_observed: usize,
    pub rmse: f64,
    pub mae: f64,
    pub changepoints: usize,
    pub seasonalities: Vec<String>,
    pub regressors: usize,
}

/// A fitted model bound to the schema it was trained on.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    schema: FrozenSchema,
    layout: DesignLayout,
    beta: Vec<f64>,
    y_scale: f64,
    sigma: f64,
    z: f64,
    summary: FitSummary,
}

impl ForecastModel {
    /// Fit on every row of `frame` with an observed target.
    ///
    /// Numerical failures become `AppError::Fit`, carrying the per-column count
    /// of missing values found in the frame at the time of failure.
    pub fn fit(frame: &FeatureFrame, schema: &FrozenSchema, config: &ModelConfig) -> Result<Self, AppError> {
        let z = interval_z(config.interval_width)?;
        check_schema(schema, &frame.regressors)?;
        if !(config.changepoint_range > 0.0 && config.changepoint_range <= 1.0) {
            return Err(AppError::Config(format!(
                "Changepoint range must be in (0, 1], got {}.",
                config.changepoint_range
            )));
        }
        for (name, scale) in [
            ("changepoint", config.changepoint_prior_scale),
            ("seasonality", config.seasonality_prior_scale),
            ("regressor", config.regressor_prior_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(AppError::Config(format!("{name} prior scale must be > 0, got {scale}.")));
            }
        }

        match fit_inner(frame, schema, config, z) {
            Ok(model) => {
                info!(
                    observed = model.summary.n_observed,
                    rmse = model.summary.rmse,
                    changepoints = model.summary.changepoints,
                    seasonalities = ?model.summary.seasonalities,
                    regressors = model.summary.regressors,
                    "model fitted"
                );
                Ok(model)
            }
            Err(reason) => {
                let residual = frame.missing_counts();
                error!(%reason, "model fit failed");
                for m in &residual {
                    error!(column = %m.column, missing = m.missing, "column holds missing values");
                }
                Err(AppError::Fit { reason, residual })
            }
        }
    }

    pub fn schema(&self) -> &FrozenSchema {
        &self.schema
    }

    pub fn layout(&self) -> &DesignLayout {
        &self.layout
    }

    pub fn summary(&self) -> &FitSummary {
        &self.summary
    }

    /// Half-width of the predictive interval.
    pub fn margin(&self) -> f64 {
        self.z * self.sigma
    }

    /// Score timestamps with their regressor values.
    ///
    /// `regressors` must reproduce the frozen schema exactly (names and order).
    pub fn predict(
        &self,
        timestamps: &[NaiveDateTime],
        regressors: &RegressorMatrix,
    ) -> Result<Vec<ForecastPoint>, AppError> {
        check_schema(&self.schema, regressors)?;
        if regressors.n_rows() != timestamps.len() {
            return Err(AppError::Data(format!(
                "Prediction input has {} timestamps but {} regressor rows.",
                timestamps.len(),
                regressors.n_rows()
            )));
        }

        let margin = self.margin();
        let mut out = Vec::with_capacity(timestamps.len());
        for (i, &ds) in timestamps.iter().enumerate() {
            let row = self.layout.design_row(ds, &regressors.row(i));
            let yhat = dot(&row, &self.beta) * self.y_scale;
            if !yhat.is_finite() {
                return Err(AppError::Fit {
                    reason: format!("non-finite prediction at {ds}"),
                    residual: regressors.non_finite_counts(),
                });
            }
            out.push(ForecastPoint {
                ds,
                yhat,
                yhat_lower: yhat - margin,
                yhat_upper: yhat + margin,
            });
        }
        Ok(out)
    }
}

fn check_schema(schema: &FrozenSchema, regressors: &RegressorMatrix) -> Result<(), AppError> {
    let expected = schema.columns();
    if regressors.columns != expected {
        return Err(AppError::SchemaMismatch {
            expected,
            found: regressors.columns.clone(),
        });
    }
    Ok(())
}

fn fit_inner(
    frame: &FeatureFrame,
    schema: &FrozenSchema,
    config: &ModelConfig,
    z: f64,
) -> Result<ForecastModel, String> {
    let observed: Vec<usize> = (0..frame.len())
        .filter(|&i| frame.target[i].is_some_and(f64::is_finite))
        .collect();
    if observed.len() < MIN_OBSERVED {
        return Err(format!(
            "need at least {MIN_OBSERVED} observed `{}` values, got {}",
            frame.target_name,
            observed.len()
        ));
    }
    if !frame.regressors.non_finite_counts().is_empty() {
        return Err("regressor columns hold non-finite values".to_string());
    }

    let t_days: Vec<f64> = observed.iter().map(|&i| days_since_epoch(frame.timestamps[i])).collect();
    let t0 = t_days[0];
    let span = t_days[t_days.len() - 1] - t0;
    if span <= 0.0 {
        return Err("observed history spans a single instant".to_string());
    }
    let min_step = t_days
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);

    let t_scaled: Vec<f64> = t_days.iter().map(|t| (t - t0) / span).collect();
    let changepoints =
        place_changepoints(&t_scaled, config.n_changepoints, config.changepoint_range).map_err(|e| e.to_string())?;
    let seasonalities = select_seasonalities(config, span, min_step);

    let regressors: Vec<RegressorScaling> = frame
        .regressors
        .columns
        .iter()
        .zip(&frame.regressors.values)
        .map(|(name, col)| {
            let values: Vec<f64> = observed.iter().map(|&i| col[i]).collect();
            regressor_scaling(name, &values)
        })
        .collect();

    let layout = DesignLayout {
        t0_days: t0,
        t_scale_days: span,
        changepoints,
        seasonalities,
        regressors,
    };

    let y: Vec<f64> = observed.iter().filter_map(|&i| frame.target[i]).collect();
    let y_scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

    let width = layout.width();
    let mut x = DMatrix::<f64>::zeros(observed.len(), width);
    for (r, &i) in observed.iter().enumerate() {
        let row = layout.design_row(frame.timestamps[i], &frame.regressors.row(i));
        for (c, v) in row.into_iter().enumerate() {
            x[(r, c)] = v;
        }
    }
    let y_scaled = DVector::from_iterator(y.len(), y.iter().map(|v| v / y_scale));

    let penalties: Vec<f64> = layout
        .components()
        .into_iter()
        .map(|c| {
            let prior = match c {
                Component::Intercept | Component::Trend => BASE_PRIOR_SCALE,
                Component::Changepoint => config.changepoint_prior_scale,
                Component::Seasonal => config.seasonality_prior_scale,
                Component::Regressor => config.regressor_prior_scale,
            };
            (NOISE_REF / prior).powi(2)
        })
        .collect();

    let beta = solve_ridge(&x, &y_scaled, &penalties)
        .ok_or_else(|| "penalized least squares solve failed (ill-conditioned design)".to_string())?;

    let fitted = &x * &beta;
    let mut sse = 0.0;
    let mut sae = 0.0;
    for (f, obs) in fitted.iter().zip(&y) {
        let e = obs - f * y_scale;
        sse += e * e;
        sae += e.abs();
    }
    let n = y.len() as f64;
    let rmse = (sse / n).sqrt();
    let mae = sae / n;
    if !rmse.is_finite() {
        return Err("non-finite residuals".to_string());
    }
    debug!(width, y_scale, rmse, "least squares solution");

    let summary = FitSummary {
        n_rows: frame.len(),
        n_observed: observed.len(),
        rmse,
        mae,
        changepoints: layout.changepoints.len(),
        seasonalities: layout.seasonalities.iter().map(|s| s.name.clone()).collect(),
        regressors: layout.regressors.len(),
    };

    Ok(ForecastModel {
        schema: schema.clone(),
        layout,
        beta: beta.iter().copied().collect(),
        y_scale,
        sigma: rmse,
        z,
        summary,
    })
}

/// Standardize with mean / sample std; 0-1 indicators and constant columns
/// are left on their own scale.
fn regressor_scaling(name: &str, values: &[f64]) -> RegressorScaling {
    let is_binary = values.iter().all(|&v| v == 0.0 || v == 1.0);
    if is_binary || values.len() < 2 {
        return RegressorScaling {
            name: name.to_string(),
            mean: 0.0,
            std: 1.0,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std < 1e-12 {
        debug!(regressor = name, "constant regressor; centering only");
        return RegressorScaling {
            name: name.to_string(),
            mean,
            std: 1.0,
        };
    }
    RegressorScaling {
        name: name.to_string(),
        mean,
        std,
    }
}
