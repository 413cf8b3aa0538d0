//! Rolling-origin cross-validation.
//!
//! Cutoffs walk back from `max - horizon` in steps of `period` for as long as
//! the previous cutoff leaves at least `initial` of history before it. When a
//! stepped cutoff has no observed target in `(cutoff, cutoff + horizon]`, it
//! jumps back to the last observation at or before it, minus `horizon`. The
//! oldest generated candidate is discarded. Each fold refits the model on rows
//! up to its cutoff, with the seasonal components of the full-history model,
//! and scores the horizon window using the regressor values actually observed
//! there.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ModelConfig;
use crate::error::AppError;
use crate::evaluate::metrics::{FoldPrediction, HorizonMetrics, horizon_metrics};
use crate::evaluate::windows::{CvWindows, WindowSummary};
use crate::features::{FeatureFrame, FrozenSchema};
use crate::fit::{ForecastModel, pin_seasonalities};

const MIN_TRAIN_OBSERVED: usize = 2;

/// Outcome of backtest evaluation. Insufficient history is not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Evaluation {
    Available(EvaluationReport),
    Unavailable(EvaluationSkipped),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub windows: WindowSummary,
    pub folds: usize,
    pub skipped_folds: usize,
    pub metrics: Vec<HorizonMetrics>,
    pub predictions: Vec<FoldPrediction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationSkipped {
    pub reason: String,
}

impl Evaluation {
    fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "evaluation skipped");
        Evaluation::Unavailable(EvaluationSkipped { reason })
    }
}

/// Candidate cutoffs in ascending order.
///
/// `observed` must be ascending. Returns an empty list when the history cannot
/// hold a single fold.
pub fn generate_cutoffs(observed: &[NaiveDateTime], windows: &CvWindows) -> Vec<NaiveDateTime> {
    let (Some(&min), Some(&max)) = (observed.first(), observed.last()) else {
        return Vec::new();
    };
    let first = max - windows.horizon;
    if first < min {
        return Vec::new();
    }

    let floor = min + windows.initial;
    let mut candidates = vec![first];
    let mut cutoff = first;
    while cutoff >= floor {
        cutoff -= windows.period;
        if !has_observation_in(observed, cutoff, cutoff + windows.horizon) && cutoff > min {
            let before = observed.partition_point(|&t| t <= cutoff);
            if let Some(&closest) = before.checked_sub(1).and_then(|i| observed.get(i)) {
                cutoff = closest - windows.horizon;
            }
        }
        candidates.push(cutoff);
    }
    candidates.pop();
    candidates.reverse();
    candidates
}

fn has_observation_in(observed: &[NaiveDateTime], lo: NaiveDateTime, hi: NaiveDateTime) -> bool {
    let start = observed.partition_point(|&t| t <= lo);
    observed.get(start).is_some_and(|&t| t <= hi)
}

/// Backtest `config` on `frame` with the given windows.
pub fn cross_validate(
    frame: &FeatureFrame,
    schema: &FrozenSchema,
    config: &ModelConfig,
    windows: &CvWindows,
) -> Result<Evaluation, AppError> {
    if windows.initial < windows.horizon {
        return Ok(Evaluation::unavailable(format!(
            "initial window of {} days is shorter than the {}-hour horizon",
            windows.initial.num_days(),
            windows.horizon.num_hours()
        )));
    }

    let observed: Vec<NaiveDateTime> = frame
        .timestamps
        .iter()
        .zip(&frame.target)
        .filter(|(_, y)| y.is_some_and(f64::is_finite))
        .map(|(&t, _)| t)
        .collect();

    let cutoffs = generate_cutoffs(&observed, windows);
    if cutoffs.is_empty() {
        return Ok(Evaluation::unavailable(
            "history too short for a single cross-validation cutoff",
        ));
    }
    debug!(cutoffs = cutoffs.len(), "cross-validation cutoffs generated");

    let mut predictions = Vec::new();
    let mut folds = 0;
    let mut skipped = 0;

    for cutoff in cutoffs {
        let train_end = frame.timestamps.partition_point(|&t| t <= cutoff);
        let test_end = frame.timestamps.partition_point(|&t| t <= cutoff + windows.horizon);

        let train = frame.slice(0..train_end);
        if train.observed_targets() < MIN_TRAIN_OBSERVED {
            debug!(%cutoff, observed = train.observed_targets(), "fold skipped: too few training targets");
            skipped += 1;
            continue;
        }

        let model = match ForecastModel::fit(&train, schema, config) {
            Ok(model) => model,
            Err(AppError::Fit { reason, .. }) => {
                warn!(%cutoff, %reason, "fold skipped: fit failed");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let test = frame.slice(train_end..test_end);
        let scored = model.predict(&test.timestamps, &test.regressors)?;
        for (point, y) in scored.iter().zip(&test.target) {
            let Some(y) = y.filter(|v| v.is_finite()) else { continue };
            predictions.push(FoldPrediction {
                cutoff,
                ds: point.ds,
                y,
                yhat: point.yhat,
                yhat_lower: point.yhat_lower,
                yhat_upper: point.yhat_upper,
            });
        }
        folds += 1;
    }

    if folds == 0 || predictions.is_empty() {
        return Ok(Evaluation::unavailable(format!(
            "no usable cross-validation folds ({skipped} skipped)"
        )));
    }

    let metrics = horizon_metrics(&predictions);
    info!(folds, skipped, buckets = metrics.len(), "cross-validation finished");
    Ok(Evaluation::Available(EvaluationReport {
        windows: windows.describe(),
        folds,
        skipped_folds: skipped,
        metrics,
        predictions,
    }))
}

/// Backtest the configuration behind `model` with windows sized from the
/// frame's own span.
///
/// Folds reuse the model's frozen schema and the seasonal components it
/// selected on the full history.
pub fn evaluate(frame: &FeatureFrame, model: &ForecastModel, config: &ModelConfig) -> Result<Evaluation, AppError> {
    let (Some(&first), Some(&last)) = (frame.timestamps.first(), frame.timestamps.last()) else {
        return Ok(Evaluation::unavailable("feature frame is empty"));
    };
    let windows = CvWindows::for_history(first, last);
    info!(
        span_days = (last - first).num_days(),
        initial_days = windows.initial.num_days(),
        period_days = windows.period.num_days(),
        "cross-validation windows selected"
    );
    let fold_config = fold_config(model, config);
    cross_validate(frame, model.schema(), &fold_config, &windows)
}

fn fold_config(model: &ForecastModel, config: &ModelConfig) -> ModelConfig {
    pin_seasonalities(config, &model.layout().seasonalities)
}

/// Horizon of a prediction relative to its cutoff.
pub fn horizon_of(p: &FoldPrediction) -> TimeDelta {
    p.ds - p.cutoff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::RegressorMatrix;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn hourly(hours: i64) -> Vec<NaiveDateTime> {
        (0..hours).map(|h| t0() + TimeDelta::hours(h)).collect()
    }

    fn frame(hours: i64) -> FeatureFrame {
        let timestamps = hourly(hours);
        let target = timestamps
            .iter()
            .enumerate()
            .map(|(i, _)| Some(20.0 + 5.0 * ((i % 24) as f64 / 24.0 * std::f64::consts::TAU).sin()))
            .collect();
        FeatureFrame {
            regressors: RegressorMatrix::new(timestamps.len()),
            timestamps,
            target_name: "PM2_5".to_string(),
            target,
            category_labels: Vec::new(),
        }
    }

    fn windows(initial_days: i64, period_days: i64) -> CvWindows {
        CvWindows {
            initial: TimeDelta::days(initial_days),
            period: TimeDelta::days(period_days),
            horizon: TimeDelta::hours(24),
        }
    }

    #[test]
    fn cutoffs_step_back_from_the_end() {
        // 10 days hourly: min = day 0, max = day 9 23:00.
        let observed = hourly(240);
        let cutoffs = generate_cutoffs(&observed, &windows(5, 1));
        let max = observed[observed.len() - 1];
        assert_eq!(cutoffs.last(), Some(&(max - TimeDelta::hours(24))));
        assert!(cutoffs.windows(2).all(|w| w[1] - w[0] == TimeDelta::days(1)));
        assert!(cutoffs.iter().all(|&c| c >= observed[0] + TimeDelta::days(5)));
        // day 8 23:00 back to day 5 23:00
        assert_eq!(cutoffs.len(), 4);
    }

    #[test]
    fn cutoffs_jump_back_over_gaps() {
        let mut observed = hourly(240);
        // Drop day 5 20:00 through day 7 22:00.
        observed.retain(|t| !(140..=190).contains(&(*t - t0()).num_hours()));
        let cutoffs = generate_cutoffs(&observed, &windows(2, 1));

        let at = |d: i64, h: i64| t0() + TimeDelta::days(d) + TimeDelta::hours(h);
        assert_eq!(
            cutoffs,
            vec![at(2, 19), at(3, 19), at(4, 19), at(6, 23), at(7, 23), at(8, 23)]
        );
        for c in &cutoffs {
            assert!(has_observation_in(&observed, *c, *c + TimeDelta::hours(24)));
        }
    }

    #[test]
    fn history_shorter_than_horizon_has_no_cutoffs() {
        assert!(generate_cutoffs(&hourly(12), &windows(0, 1)).is_empty());
        assert!(generate_cutoffs(&[], &windows(0, 1)).is_empty());
    }

    fn fit_primary(f: &FeatureFrame) -> ForecastModel {
        ForecastModel::fit(f, &FrozenSchema::default(), &ModelConfig::default()).unwrap()
    }

    #[test]
    fn one_day_span_is_unavailable() {
        let f = frame(30);
        let eval = evaluate(&f, &fit_primary(&f), &ModelConfig::default()).unwrap();
        assert!(matches!(eval, Evaluation::Unavailable(_)));
    }

    #[test]
    fn multi_day_history_produces_horizon_metrics() {
        let f = frame(24 * 8);
        let eval = evaluate(&f, &fit_primary(&f), &ModelConfig::default()).unwrap();
        let Evaluation::Available(report) = eval else {
            panic!("expected an evaluation report");
        };
        assert!(report.folds >= 1);
        assert_eq!(report.windows.horizon_hours, 24);
        assert!(!report.metrics.is_empty());
        assert!(report.metrics.iter().all(|m| m.horizon_hours > 0.0 && m.horizon_hours <= 24.0));
        assert!(report.predictions.iter().all(|p| {
            let h = horizon_of(p);
            h > TimeDelta::zero() && h <= TimeDelta::hours(24)
        }));
    }

    #[test]
    fn folds_keep_the_full_history_seasonalities() {
        let f = frame(24 * 20);
        let primary = fit_primary(&f);
        assert_eq!(primary.summary().seasonalities, vec!["weekly", "daily"]);

        let cfg = fold_config(&primary, &ModelConfig::default());
        let observed: Vec<NaiveDateTime> = f.timestamps.clone();
        let cutoffs = generate_cutoffs(&observed, &CvWindows::for_history(observed[0], observed[observed.len() - 1]));
        assert!(!cutoffs.is_empty());
        for cutoff in cutoffs {
            let end = f.timestamps.partition_point(|&t| t <= cutoff);
            let fold = ForecastModel::fit(&f.slice(0..end), primary.schema(), &cfg).unwrap();
            assert_eq!(fold.summary().seasonalities, primary.summary().seasonalities, "cutoff {cutoff}");
        }
    }

    #[test]
    fn unavailable_serializes_with_status_tag() {
        let eval = Evaluation::Unavailable(EvaluationSkipped {
            reason: "short".to_string(),
        });
        let json = serde_json::to_value(&eval).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "short");
    }
}
