//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - produced once by a stage and handed to the next one by value
//! - written to / reloaded from the processed CSV
//! - snapshotted by the versioned observation store

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Combined timestamp column of the consolidated series.
pub const DATETIME: &str = "DATETIME";
/// Calendar date column (after the hour-24 rollover).
pub const SKT_DATE: &str = "SKT_DATE";
/// Normalized `HH:00` time column.
pub const SKT_TIME: &str = "SKT_TIME";
/// Station code column of raw extracts. Dropped from the consolidated series.
pub const SKT_CD: &str = "SKT_CD";

/// Measurement columns of the consolidated series, in canonical order (target last).
pub const MEASUREMENT_COLUMNS: [&str; 16] = [
    "SO2", "NO", "NO2", "NOX", "CO", "OX", "NMHC", "CH4", "THC", "SPM", "SP", "WD", "WS", "TEMP", "HUM", "PM2_5",
];

pub const DEFAULT_TARGET: &str = "PM2_5";

pub const DEFAULT_NUMERIC_REGRESSORS: [&str; 14] = [
    "SO2", "NO", "NO2", "NOX", "CO", "OX", "NMHC", "CH4", "THC", "SPM", "SP", "WS", "TEMP", "HUM",
];

pub const DEFAULT_CATEGORICAL_REGRESSORS: [&str; 1] = ["WD"];

/// Timestamp format used in the consolidated CSV and forecast outputs.
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Full canonical header of the consolidated series.
pub fn canonical_header() -> Vec<String> {
    [DATETIME, SKT_DATE, SKT_TIME]
        .into_iter()
        .chain(MEASUREMENT_COLUMNS)
        .map(str::to_string)
        .collect()
}

/// How rows that resolve to the same canonical timestamp are resolved.
///
/// Both rules keep exactly one source row; readings are never averaged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// The last row in read order wins (files enumerated in sorted path order,
    /// rows in file order).
    #[default]
    ReadOrder,
    /// The row from the station listed earliest wins; stations not listed rank
    /// below every listed one. Read order breaks the remaining ties.
    StationPriority(Vec<String>),
}

impl TieBreak {
    /// Rank of a station under this rule. Higher rank wins.
    pub fn rank(&self, station: Option<&str>) -> usize {
        match self {
            TieBreak::ReadOrder => 0,
            TieBreak::StationPriority(order) => station
                .and_then(|s| order.iter().position(|p| p.eq_ignore_ascii_case(s.trim())))
                .map(|pos| order.len() - pos)
                .unwrap_or(0),
        }
    }
}

/// Inclusive calendar-date bounds applied to the consolidated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let date = ts.date();
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Configuration for the ingestion stage.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub window: DateWindow,
    pub tie_break: TieBreak,
}

/// Whether a seasonal component is included in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Seasonality {
    /// Decide from the history length and sampling interval.
    #[default]
    Auto,
    On,
    Off,
}

/// Hyperparameters of the additive model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub regressor_prior_scale: f64,
    /// Coverage of the predictive interval (e.g. 0.8 for an 80% band).
    pub interval_width: f64,
    pub yearly: Seasonality,
    pub weekly: Seasonality,
    pub daily: Seasonality,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            regressor_prior_scale: 10.0,
            interval_width: 0.8,
            yearly: Seasonality::Auto,
            weekly: Seasonality::Auto,
            daily: Seasonality::Auto,
        }
    }
}

/// Which regressors feed the model and how gaps are judged.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub target: String,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    /// Regressors whose missing ratio is at or above this value are dropped.
    pub missing_threshold: f64,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            numeric: DEFAULT_NUMERIC_REGRESSORS.iter().map(|s| s.to_string()).collect(),
            categorical: DEFAULT_CATEGORICAL_REGRESSORS.iter().map(|s| s.to_string()).collect(),
            missing_threshold: 0.8,
        }
    }
}

/// Configuration for the train + forecast + evaluate stage.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Explicit consolidated CSV. When absent the newest file in `processed_dir` is used.
    pub input: Option<PathBuf>,
    pub processed_dir: PathBuf,
    pub predict_dir: PathBuf,
    pub features: FeatureSpec,
    pub model: ModelConfig,
    pub horizon: usize,
    pub step: TimeDelta,
    pub evaluate: bool,
    pub export_evaluation: Option<PathBuf>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

/// Configuration for the acquisition client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub raw_dir: PathBuf,
    pub prefecture: String,
    pub stations: Vec<String>,
    /// First month requested, `YYYYMM`.
    pub start_ym: String,
    /// Last month requested, `YYYYMM`.
    pub end_ym: String,
}

/// Configuration for synthetic extract generation.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub raw_dir: PathBuf,
    pub stations: Vec<String>,
    pub start: NaiveDate,
    pub days: usize,
    pub seed: u64,
    /// Per-cell probability that a reading is left blank.
    pub gap_prob: f64,
}

/// One consolidated hourly record.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    /// Calendar date after the hour-24 rollover.
    pub date: NaiveDate,
    /// Normalized `HH:00` label.
    pub time: String,
    /// Station that supplied the row, when known.
    pub station: Option<String>,
    /// Raw cell values aligned with `ObservationTable::columns`.
    pub values: Vec<Option<String>>,
}

/// Ordered hourly series with one row per canonical timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationTable {
    pub columns: Vec<String>,
    pub rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Column values parsed as numbers. Unparseable or non-finite cells are missing.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| {
                    r.values
                        .get(idx)
                        .and_then(|v| v.as_deref())
                        .and_then(|s| s.trim().parse::<f64>().ok())
                        .filter(|v| v.is_finite())
                })
                .collect(),
        )
    }

    pub fn text_column(&self, name: &str) -> Option<Vec<Option<String>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.values.get(idx).cloned().flatten())
                .collect(),
        )
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.last().map(|r| r.timestamp)
    }
}

/// One forecast row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub ds: NaiveDateTime,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_header_puts_target_last() {
        let header = canonical_header();
        assert_eq!(header.len(), 19);
        assert_eq!(header[0], DATETIME);
        assert_eq!(header[1], SKT_DATE);
        assert_eq!(header[2], SKT_TIME);
        assert_eq!(header.last().map(String::as_str), Some(DEFAULT_TARGET));
        assert!(!header.iter().any(|c| c == SKT_CD));
    }

    #[test]
    fn station_priority_ranks_listed_stations_higher() {
        let rule = TieBreak::StationPriority(vec!["A".to_string(), "B".to_string()]);
        assert!(rule.rank(Some("A")) > rule.rank(Some("B")));
        assert!(rule.rank(Some("B")) > rule.rank(Some("Z")));
        assert_eq!(rule.rank(None), 0);
        assert_eq!(TieBreak::ReadOrder.rank(Some("A")), 0);
    }

    #[test]
    fn date_window_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let window = DateWindow {
            start: Some(d(2)),
            end: Some(d(3)),
        };
        assert!(!window.contains(d(1).and_hms_opt(23, 0, 0).unwrap()));
        assert!(window.contains(d(2).and_hms_opt(0, 0, 0).unwrap()));
        assert!(window.contains(d(3).and_hms_opt(23, 0, 0).unwrap()));
        assert!(!window.contains(d(4).and_hms_opt(0, 0, 0).unwrap()));
    }
}
