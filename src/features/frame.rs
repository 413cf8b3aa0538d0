//! Model-ready tables and the frozen regressor schema.

use std::ops::Range;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{AppError, MissingCount};
use crate::features::encode::CategoricalEncoding;

/// The regressor column set fixed at preparation time.
///
/// Column order: retained numeric regressors (candidate order), then the dummy
/// columns of each categorical regressor (candidate order, level order).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FrozenSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<CategoricalEncoding>,
    /// Candidate regressors excluded for excess missingness.
    pub dropped: Vec<String>,
}

impl FrozenSchema {
    pub fn columns(&self) -> Vec<String> {
        self.numeric
            .iter()
            .cloned()
            .chain(self.categorical.iter().flat_map(|c| c.column_names()))
            .collect()
    }

    pub fn width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.levels.len()).sum::<usize>()
    }
}

/// Dense regressor values, stored column by column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegressorMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
    n_rows: usize,
}

impl RegressorMatrix {
    pub fn new(n_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
            n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), AppError> {
        let name = name.into();
        if values.len() != self.n_rows {
            return Err(AppError::Data(format!(
                "Regressor `{name}` has {} rows, expected {}.",
                values.len(),
                self.n_rows
            )));
        }
        self.columns.push(name);
        self.values.push(values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[idx])
    }

    /// Values of one row, in column order.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.values.iter().map(|col| col[i]).collect()
    }

    pub fn slice(&self, rows: Range<usize>) -> Self {
        Self {
            columns: self.columns.clone(),
            values: self.values.iter().map(|col| col[rows.clone()].to_vec()).collect(),
            n_rows: rows.len(),
        }
    }

    /// Columns holding NaN or infinite values.
    pub fn non_finite_counts(&self) -> Vec<MissingCount> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(name, col)| MissingCount {
                column: name.clone(),
                missing: col.iter().filter(|v| !v.is_finite()).count(),
            })
            .filter(|m| m.missing > 0)
            .collect()
    }
}

/// Reorder named columns to the frozen schema.
///
/// Schema columns absent from `named` are zero-filled; extra columns are dropped.
pub fn align_to_schema(
    named: Vec<(String, Vec<f64>)>,
    schema: &FrozenSchema,
    n_rows: usize,
) -> Result<RegressorMatrix, AppError> {
    let mut named = named;
    let mut out = RegressorMatrix::new(n_rows);
    for name in schema.columns() {
        let values = match named.iter().position(|(n, _)| *n == name) {
            Some(idx) => named.swap_remove(idx).1,
            None => vec![0.0; n_rows],
        };
        out.push_column(name, values)?;
    }
    Ok(out)
}

/// Regression-ready table: timestamps, target and regressors.
///
/// Rows with a missing target stay in the frame; the model ignores them.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub timestamps: Vec<NaiveDateTime>,
    pub target_name: String,
    pub target: Vec<Option<f64>>,
    pub regressors: RegressorMatrix,
    /// Filled labels per categorical regressor, aligned with `FrozenSchema::categorical`.
    pub category_labels: Vec<Vec<String>>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn observed_targets(&self) -> usize {
        self.target.iter().filter(|v| v.is_some_and(f64::is_finite)).count()
    }

    pub fn slice(&self, rows: Range<usize>) -> Self {
        Self {
            timestamps: self.timestamps[rows.clone()].to_vec(),
            target_name: self.target_name.clone(),
            target: self.target[rows.clone()].to_vec(),
            regressors: self.regressors.slice(rows.clone()),
            category_labels: self.category_labels.iter().map(|c| c[rows.clone()].to_vec()).collect(),
        }
    }

    /// Residual gaps per column, target included. Used for fit diagnostics.
    pub fn missing_counts(&self) -> Vec<MissingCount> {
        let mut out = Vec::new();
        let target_missing = self.target.iter().filter(|v| !v.is_some_and(f64::is_finite)).count();
        if target_missing > 0 {
            out.push(MissingCount {
                column: self.target_name.clone(),
                missing: target_missing,
            });
        }
        out.extend(self.regressors.non_finite_counts());
        out
    }
}
