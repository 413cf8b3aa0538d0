//! Crate-wide error type.
//!
//! Every fatal condition maps to a process exit code:
//!
//! - `2` input or configuration problems (no raw files, bad flags, unreadable paths)
//! - `3` data that cannot support the requested stage (residual gaps, schema mismatch)
//! - `4` numerical or runtime failures (fit breakdown, acquisition errors)
//!
//! Non-fatal outcomes (dropped regressors, skipped evaluation) are plain values,
//! not errors; see `features::DataQualityWarning` and `evaluate::EvaluationSkipped`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A column that still holds missing values, and how many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

impl fmt::Display for MissingCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column, self.missing)
    }
}

fn join_counts(columns: &[MissingCount]) -> String {
    columns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum AppError {
    /// No raw station extracts were found.
    #[error("No raw station extracts (*.csv) found in '{}'.", .dir.display())]
    EmptyInput { dir: PathBuf },

    /// Missing values survived the fill policy.
    #[error("Missing values remain after imputation: {}", join_counts(.columns))]
    ImputationIntegrity { columns: Vec<MissingCount> },

    /// Numerical fitting failure. `residual` lists columns that still held gaps at fit time.
    #[error("Model fit failed: {reason}{}", fmt_residual(.residual))]
    Fit {
        reason: String,
        residual: Vec<MissingCount>,
    },

    /// Prediction input does not reproduce the frozen regressor schema.
    #[error("Regressor schema mismatch: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Inputs exist but cannot support the requested stage.
    #[error("{0}")]
    Data(String),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data acquisition failed (network, status, or decoding).
    #[error("Fetch failed: {0}")]
    Fetch(String),
}

fn fmt_residual(residual: &[MissingCount]) -> String {
    if residual.is_empty() {
        String::new()
    } else {
        format!(" (columns with missing values: {})", join_counts(residual))
    }
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::EmptyInput { .. } | AppError::Config(_) | AppError::Io { .. } | AppError::Csv { .. } => 2,
            AppError::ImputationIntegrity { .. } | AppError::SchemaMismatch { .. } | AppError::Data(_) => 3,
            AppError::Fit { .. } | AppError::Json(_) | AppError::Fetch(_) => 4,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        AppError::Csv {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imputation_error_names_every_column() {
        let err = AppError::ImputationIntegrity {
            columns: vec![
                MissingCount {
                    column: "SO2".to_string(),
                    missing: 3,
                },
                MissingCount {
                    column: "TEMP".to_string(),
                    missing: 1,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Missing values remain after imputation: SO2=3, TEMP=1"
        );
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn fit_error_reports_residual_gaps() {
        let err = AppError::Fit {
            reason: "singular design".to_string(),
            residual: vec![MissingCount {
                column: "HUM".to_string(),
                missing: 2,
            }],
        };
        assert_eq!(
            err.to_string(),
            "Model fit failed: singular design (columns with missing values: HUM=2)"
        );
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn empty_input_is_a_configuration_failure() {
        let err = AppError::EmptyInput {
            dir: PathBuf::from("data/raw"),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("data/raw"));
    }
}
