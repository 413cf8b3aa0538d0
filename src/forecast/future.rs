//! Future frame synthesis.
//!
//! Regressors are not forecast: every future row repeats the last observed
//! value of each numeric regressor and the last observed label of each
//! categorical regressor. Labels are re-encoded with the training encoding and
//! the result is aligned to the frozen schema (absent columns zero-filled).

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::AppError;
use crate::features::{FeatureFrame, RegressorMatrix, align_to_schema};
use crate::fit::ForecastModel;

/// Rows extending the timeline beyond the last observation.
#[derive(Debug, Clone, PartialEq)]
pub struct FutureFrame {
    pub timestamps: Vec<NaiveDateTime>,
    pub regressors: RegressorMatrix,
}

/// Build `horizon` rows spaced `step` apart after the frame's last timestamp.
pub fn make_future_frame(
    model: &ForecastModel,
    frame: &FeatureFrame,
    horizon: usize,
    step: TimeDelta,
) -> Result<FutureFrame, AppError> {
    if horizon == 0 {
        return Err(AppError::Config("Forecast horizon must be >= 1.".to_string()));
    }
    if step <= TimeDelta::zero() {
        return Err(AppError::Config("Step granularity must be positive.".to_string()));
    }
    let last = *frame
        .timestamps
        .last()
        .ok_or_else(|| AppError::Data("Cannot extend an empty feature frame.".to_string()))?;

    let mut timestamps = Vec::with_capacity(horizon);
    let mut ts = last;
    for _ in 0..horizon {
        ts = ts
            .checked_add_signed(step)
            .ok_or_else(|| AppError::Data(format!("Future timestamp overflows after {ts}.")))?;
        timestamps.push(ts);
    }

    let schema = model.schema();
    let mut named = Vec::with_capacity(schema.width());

    for name in &schema.numeric {
        let last_value = frame
            .regressors
            .column(name)
            .and_then(|col| col.last().copied())
            .ok_or_else(|| AppError::SchemaMismatch {
                expected: schema.columns(),
                found: frame.regressors.columns.clone(),
            })?;
        named.push((name.clone(), vec![last_value; horizon]));
    }

    for (encoding, labels) in schema.categorical.iter().zip(&frame.category_labels) {
        let Some(last_label) = labels.last() else { continue };
        let carried = vec![last_label.clone(); horizon];
        named.extend(encoding.encode_column(&carried));
    }

    let regressors = align_to_schema(named, schema, horizon)?;
    Ok(FutureFrame { timestamps, regressors })
}
