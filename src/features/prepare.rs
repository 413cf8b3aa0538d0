//! Feature preparation: select, impute and encode regressors.
//!
//! Steps, in order:
//!
//! 1. drop numeric regressors whose missing ratio is at or above the threshold
//! 2. fill the retained numeric regressors (see `features::impute`)
//! 3. fill categorical regressors with `Unknown` and one-hot encode them (k-1)
//! 4. verify no gaps survived, then freeze the realized column set
//!
//! The target is never imputed.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{FeatureSpec, ObservationTable};
use crate::error::{AppError, MissingCount};
use crate::features::encode::{CategoricalEncoding, fill_unknown};
use crate::features::frame::{FeatureFrame, FrozenSchema, RegressorMatrix};
use crate::features::impute::{count_missing, fill_gaps, missing_ratio};

/// A candidate regressor excluded for excess missingness. Non-fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityWarning {
    pub column: String,
    pub missing_ratio: f64,
    pub threshold: f64,
    /// The column does not exist in the series at all.
    pub absent: bool,
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absent {
            write!(f, "regressor `{}` is absent from the series; dropped", self.column)
        } else {
            write!(
                f,
                "regressor `{}` is {:.1}% missing (threshold {:.1}%); dropped",
                self.column,
                self.missing_ratio * 100.0,
                self.threshold * 100.0
            )
        }
    }
}

/// Output of feature preparation.
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub frame: FeatureFrame,
    pub schema: FrozenSchema,
    pub warnings: Vec<DataQualityWarning>,
}

pub fn prepare_features(table: &ObservationTable, spec: &FeatureSpec) -> Result<PreparedFeatures, AppError> {
    if table.is_empty() {
        return Err(AppError::Data("No observations to prepare features from.".to_string()));
    }
    if !(spec.missing_threshold > 0.0 && spec.missing_threshold <= 1.0) {
        return Err(AppError::Config(format!(
            "Missing-ratio threshold must be in (0, 1], got {}.",
            spec.missing_threshold
        )));
    }

    let n = table.len();
    let target = table.numeric_column(&spec.target).ok_or_else(|| {
        AppError::Data(format!("Target column `{}` not found in the series.", spec.target))
    })?;

    let mut warnings = Vec::new();
    let mut numeric_names = Vec::new();
    let mut numeric_filled = Vec::new();

    for name in &spec.numeric {
        if name.eq_ignore_ascii_case(&spec.target) {
            continue;
        }
        let Some(values) = table.numeric_column(name) else {
            warnings.push(DataQualityWarning {
                column: name.clone(),
                missing_ratio: 1.0,
                threshold: spec.missing_threshold,
                absent: true,
            });
            continue;
        };

        let ratio = missing_ratio(&values);
        if ratio >= spec.missing_threshold {
            warnings.push(DataQualityWarning {
                column: name.clone(),
                missing_ratio: ratio,
                threshold: spec.missing_threshold,
                absent: false,
            });
            continue;
        }

        numeric_names.push(name.clone());
        numeric_filled.push(fill_gaps(values));
    }

    let mut encodings = Vec::new();
    let mut category_labels = Vec::new();
    for name in &spec.categorical {
        let Some(raw) = table.text_column(name) else {
            warnings.push(DataQualityWarning {
                column: name.clone(),
                missing_ratio: 1.0,
                threshold: spec.missing_threshold,
                absent: true,
            });
            continue;
        };
        let labels = fill_unknown(&raw);
        if let Some(encoding) = CategoricalEncoding::learn(name, &labels) {
            encodings.push(encoding);
            category_labels.push(labels);
        }
    }

    for w in &warnings {
        warn!(column = %w.column, missing_ratio = w.missing_ratio, threshold = w.threshold, "{w}");
    }

    let named: Vec<(&str, &[Option<f64>])> = numeric_names
        .iter()
        .map(String::as_str)
        .zip(numeric_filled.iter().map(Vec::as_slice))
        .collect();
    check_integrity(&named)?;

    let mut regressors = RegressorMatrix::new(n);
    for (name, values) in numeric_names.iter().zip(numeric_filled) {
        regressors.push_column(name.clone(), values.into_iter().flatten().collect())?;
    }
    for (encoding, labels) in encodings.iter().zip(&category_labels) {
        for (name, values) in encoding.encode_column(labels) {
            regressors.push_column(name, values)?;
        }
    }

    let schema = FrozenSchema {
        numeric: numeric_names,
        categorical: encodings,
        dropped: warnings.iter().map(|w| w.column.clone()).collect(),
    };
    info!(
        rows = n,
        regressors = schema.width(),
        dropped = schema.dropped.len(),
        "prepared features"
    );

    let frame = FeatureFrame {
        timestamps: table.timestamps(),
        target_name: spec.target.clone(),
        target,
        regressors,
        category_labels,
    };

    Ok(PreparedFeatures {
        frame,
        schema,
        warnings,
    })
}

/// Fail with `ImputationIntegrity` naming every column that still has gaps.
pub fn check_integrity(columns: &[(&str, &[Option<f64>])]) -> Result<(), AppError> {
    let offending: Vec<MissingCount> = columns
        .iter()
        .map(|(name, values)| MissingCount {
            column: name.to_string(),
            missing: count_missing(values),
        })
        .filter(|m| m.missing > 0)
        .collect();

    if offending.is_empty() {
        Ok(())
    } else {
        Err(AppError::ImputationIntegrity { columns: offending })
    }
}
