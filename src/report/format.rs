//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline stages stay free of presentation
//! details and output changes stay localized.

use std::path::Path;

use crate::domain::{DATETIME_FMT, ForecastPoint};
use crate::evaluate::{Evaluation, HorizonMetrics};
use crate::features::PreparedFeatures;
use crate::fit::FitSummary;
use crate::io::IngestedData;

const MAX_ROW_ERRORS: usize = 5;

/// Ingestion stage summary.
pub fn format_ingest_summary(ingested: &IngestedData, retained: usize, written: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== aq - ingest ===\n");
    out.push_str(&format!("Files: {}\n", ingested.files.len()));
    out.push_str(&format!(
        "Rows: read={} | duplicates={} | consolidated={} | retained={}\n",
        ingested.rows_read,
        ingested.duplicates,
        ingested.table.len(),
        retained,
    ));
    if let (Some(first), Some(last)) = (ingested.table.first_timestamp(), ingested.table.last_timestamp()) {
        out.push_str(&format!(
            "Range: [{}, {}]\n",
            first.format(DATETIME_FMT),
            last.format(DATETIME_FMT)
        ));
    }

    if !ingested.row_errors.is_empty() {
        out.push_str(&format!("Skipped rows: {}\n", ingested.row_errors.len()));
        for e in ingested.row_errors.iter().take(MAX_ROW_ERRORS) {
            let file = e.file.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
            out.push_str(&format!("  {file}:{} {}\n", e.line, truncate(&e.message, 60)));
        }
        if ingested.row_errors.len() > MAX_ROW_ERRORS {
            out.push_str(&format!("  ... {} more\n", ingested.row_errors.len() - MAX_ROW_ERRORS));
        }
    }

    out.push_str(&format!("Wrote: {}\n", written.display()));
    out
}

/// Feature preparation summary: frozen schema and dropped candidates.
pub fn format_feature_summary(prepared: &PreparedFeatures) -> String {
    let mut out = String::new();
    let frame = &prepared.frame;

    out.push_str(&format!(
        "Target: {} | rows={} | observed={}\n",
        frame.target_name,
        frame.len(),
        frame.observed_targets()
    ));
    out.push_str(&format!("Regressors ({}):", prepared.schema.width()));
    if prepared.schema.width() == 0 {
        out.push_str(" none");
    }
    out.push('\n');
    for name in &prepared.schema.numeric {
        out.push_str(&format!("  {name}\n"));
    }
    for enc in &prepared.schema.categorical {
        out.push_str(&format!(
            "  {} (baseline {}; {} indicator columns)\n",
            enc.source,
            enc.baseline,
            enc.levels.len()
        ));
    }
    for w in &prepared.warnings {
        out.push_str(&format!("warning: {w}\n"));
    }
    out
}

/// Fit diagnostics.
pub fn format_fit_summary(summary: &FitSummary, margin: f64, interval_width: f64) -> String {
    let mut out = String::new();

    out.push_str("\nModel:\n");
    out.push_str(&format!(
        "- observed={} of {} rows | RMSE={:.3} MAE={:.3}\n",
        summary.n_observed, summary.n_rows, summary.rmse, summary.mae
    ));
    out.push_str(&format!(
        "- changepoints={} | regressors={} | seasonality: {}\n",
        summary.changepoints,
        summary.regressors,
        if summary.seasonalities.is_empty() {
            "none".to_string()
        } else {
            summary.seasonalities.join(", ")
        }
    ));
    out.push_str(&format!(
        "- interval: {:.0}% (±{margin:.3})\n",
        interval_width * 100.0
    ));
    out
}

/// Forecast rows as a fixed-width table.
pub fn format_forecast_table(points: &[ForecastPoint]) -> String {
    let mut out = String::new();
    out.push_str(
        format!("{:<19} {:>12} {:>12} {:>12}\n", "ds", "yhat", "yhat_lower", "yhat_upper").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<19} {:-<12} {:-<12} {:-<12}\n", "", "", "", "").trim_end());
    out.push('\n');

    for p in points {
        out.push_str(&format!(
            "{:<19} {:>12.3} {:>12.3} {:>12.3}\n",
            p.ds.format(DATETIME_FMT),
            p.yhat,
            p.yhat_lower,
            p.yhat_upper
        ));
    }
    out
}

/// Per-horizon metrics table, or the reason evaluation was skipped.
pub fn format_evaluation(evaluation: &Evaluation) -> String {
    let report = match evaluation {
        Evaluation::Unavailable(skipped) => {
            return format!("Evaluation: unavailable ({})\n", skipped.reason);
        }
        Evaluation::Available(report) => report,
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Evaluation: folds={} skipped={} | initial={}d period={}d horizon={}h\n",
        report.folds,
        report.skipped_folds,
        report.windows.initial_days,
        report.windows.period_days,
        report.windows.horizon_hours,
    ));
    out.push_str(
        format!(
            "{:>8} {:>5} {:>10} {:>10} {:>10} {:>8} {:>8} {:>8} {:>8}\n",
            "horizon", "n", "mse", "rmse", "mae", "mape", "mdape", "smape", "coverage"
        )
        .trim_end(),
    );
    out.push('\n');
    for m in &report.metrics {
        out.push_str(&format_metric_row(m));
    }
    out
}

fn format_metric_row(m: &HorizonMetrics) -> String {
    format!(
        "{:>7}h {:>5} {:>10.3} {:>10.3} {:>10.3} {:>8} {:>8} {:>8.3} {:>8.3}\n",
        fmt_hours(m.horizon_hours),
        m.n,
        m.mse,
        m.rmse,
        m.mae,
        fmt_opt(m.mape),
        fmt_opt(m.mdape),
        m.smape,
        m.coverage
    )
}

fn fmt_hours(h: f64) -> String {
    if h.fract() == 0.0 {
        format!("{h:.0}")
    } else {
        format!("{h:.2}")
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "n/a".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{EvaluationReport, EvaluationSkipped, WindowSummary};
    use chrono::NaiveDate;

    #[test]
    fn forecast_table_has_header_and_one_line_per_point() {
        let ds = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(1, 0, 0).unwrap();
        let txt = format_forecast_table(&[ForecastPoint {
            ds,
            yhat: 12.5,
            yhat_lower: 10.0,
            yhat_upper: 15.0,
        }]);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ds"));
        assert!(lines[2].starts_with("2024-04-01 01:00:00"));
        assert!(lines[2].contains("12.500"));
    }

    #[test]
    fn unavailable_evaluation_is_a_notice() {
        let txt = format_evaluation(&Evaluation::Unavailable(EvaluationSkipped {
            reason: "history too short".to_string(),
        }));
        assert_eq!(txt, "Evaluation: unavailable (history too short)\n");
    }

    #[test]
    fn evaluation_rows_show_missing_percentages_as_na() {
        let txt = format_evaluation(&Evaluation::Available(EvaluationReport {
            windows: WindowSummary {
                initial_days: 20,
                period_days: 1,
                horizon_hours: 24,
            },
            folds: 3,
            skipped_folds: 0,
            metrics: vec![HorizonMetrics {
                horizon_hours: 1.0,
                n: 3,
                mse: 4.0,
                rmse: 2.0,
                mae: 1.5,
                mape: None,
                mdape: None,
                smape: 0.1,
                coverage: 0.667,
            }],
            predictions: Vec::new(),
        }));
        assert!(txt.starts_with("Evaluation: folds=3"));
        let row = txt.lines().nth(2).unwrap();
        assert!(row.trim_start().starts_with("1h"));
        assert_eq!(row.matches("n/a").count(), 2);
    }

    #[test]
    fn truncate_long_messages() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
