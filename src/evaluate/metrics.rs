//! Per-horizon accuracy metrics.
//!
//! Fold predictions are grouped by horizon (`ds - cutoff`) and each group gets:
//! MSE, RMSE, MAE, MAPE, MdAPE, sMAPE and interval coverage. Percentage
//! errors are undefined when an actual is (near) zero; they are reported as
//! `None` for that bucket.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

const ZERO_EPS: f64 = 1e-8;

/// One out-of-sample prediction from a cross-validation fold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FoldPrediction {
    pub cutoff: NaiveDateTime,
    pub ds: NaiveDateTime,
    pub y: f64,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonMetrics {
    pub horizon_hours: f64,
    pub n: usize,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: Option<f64>,
    pub mdape: Option<f64>,
    pub smape: f64,
    pub coverage: f64,
}

/// Aggregate predictions into one row per distinct horizon, ascending.
pub fn horizon_metrics(predictions: &[FoldPrediction]) -> Vec<HorizonMetrics> {
    let mut buckets: BTreeMap<i64, Vec<&FoldPrediction>> = BTreeMap::new();
    for p in predictions {
        buckets.entry((p.ds - p.cutoff).num_seconds()).or_default().push(p);
    }

    buckets
        .into_iter()
        .map(|(secs, group)| bucket_metrics(secs as f64 / 3600.0, &group))
        .collect()
}

fn bucket_metrics(horizon_hours: f64, group: &[&FoldPrediction]) -> HorizonMetrics {
    let n = group.len() as f64;
    let errors: Vec<f64> = group.iter().map(|p| p.y - p.yhat).collect();

    let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    let any_zero = group.iter().any(|p| p.y.abs() < ZERO_EPS);
    let (mape, mdape) = if any_zero {
        (None, None)
    } else {
        let mut ape: Vec<f64> = group.iter().map(|p| ((p.y - p.yhat) / p.y).abs()).collect();
        let mape = ape.iter().sum::<f64>() / n;
        ape.sort_by(|a, b| a.total_cmp(b));
        (Some(mape), Some(median_sorted(&ape)))
    };

    let smape = group
        .iter()
        .map(|p| {
            let denom = p.y.abs() + p.yhat.abs();
            if denom < ZERO_EPS { 0.0 } else { 2.0 * (p.y - p.yhat).abs() / denom }
        })
        .sum::<f64>()
        / n;

    let covered = group
        .iter()
        .filter(|p| p.y >= p.yhat_lower && p.y <= p.yhat_upper)
        .count();

    HorizonMetrics {
        horizon_hours,
        n: group.len(),
        mse,
        rmse: mse.sqrt(),
        mae,
        mape,
        mdape,
        smape,
        coverage: covered as f64 / n,
    }
}

fn median_sorted(values: &[f64]) -> f64 {
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};

    fn pred(cutoff_day: u32, hours_ahead: i64, y: f64, yhat: f64) -> FoldPrediction {
        let cutoff = NaiveDate::from_ymd_opt(2024, 1, cutoff_day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        FoldPrediction {
            cutoff,
            ds: cutoff + TimeDelta::hours(hours_ahead),
            y,
            yhat,
            yhat_lower: yhat - 1.0,
            yhat_upper: yhat + 1.0,
        }
    }

    #[test]
    fn groups_by_horizon_and_computes_errors() {
        let preds = vec![
            pred(1, 1, 10.0, 12.0),
            pred(2, 1, 10.0, 8.0),
            pred(1, 2, 4.0, 4.5),
        ];
        let m = horizon_metrics(&preds);
        assert_eq!(m.len(), 2);

        let h1 = &m[0];
        assert_eq!(h1.horizon_hours, 1.0);
        assert_eq!(h1.n, 2);
        assert!((h1.mse - 4.0).abs() < 1e-12);
        assert!((h1.rmse - 2.0).abs() < 1e-12);
        assert!((h1.mae - 2.0).abs() < 1e-12);
        assert!((h1.mape.unwrap() - 0.2).abs() < 1e-12);
        assert!((h1.mdape.unwrap() - 0.2).abs() < 1e-12);
        // |10-12|/11 and |10-8|/9, each doubled.
        let expected_smape = (4.0 / 22.0 + 4.0 / 18.0) / 2.0;
        assert!((h1.smape - expected_smape).abs() < 1e-12);
        assert_eq!(h1.coverage, 0.0);

        let h2 = &m[1];
        assert_eq!(h2.horizon_hours, 2.0);
        assert_eq!(h2.coverage, 1.0);
    }

    #[test]
    fn percentage_errors_undefined_for_zero_actuals() {
        let m = horizon_metrics(&[pred(1, 1, 0.0, 0.0), pred(2, 1, 2.0, 1.0)]);
        assert_eq!(m[0].mape, None);
        assert_eq!(m[0].mdape, None);
        assert!((m[0].smape - (0.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn median_of_even_and_odd_lengths() {
        assert_eq!(median_sorted(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median_sorted(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }
}
