use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeDelta};

use aq_forecast::app::pipeline::{run_forecast, run_ingest};
use aq_forecast::data::sample::run_sample;
use aq_forecast::domain::{
    DateWindow, FeatureSpec, ForecastConfig, IngestConfig, ModelConfig, SampleConfig, TieBreak,
};
use aq_forecast::error::AppError;
use aq_forecast::evaluate::Evaluation;

fn write_extract(dir: &Path, name: &str, station: &str, hours: std::ops::RangeInclusive<u32>) {
    let mut text = String::from("SKT_CD,SKT_DATE,SKT_TIME,TEMP,WS,WD,PM2_5\n");
    for h in hours {
        let wd = ["N", "S", "E"][(h % 3) as usize];
        text.push_str(&format!(
            "{station},2024/04/01,{h},{:.1},{:.1},{wd},{}\n",
            10.0 + h as f64 * 0.5,
            1.0 + (h % 4) as f64 * 0.5,
            8 + h % 6
        ));
    }
    fs::write(dir.join(name), text).unwrap();
}

fn ingest_config(raw: &Path, processed: &Path) -> IngestConfig {
    IngestConfig {
        raw_dir: raw.to_path_buf(),
        processed_dir: processed.to_path_buf(),
        window: DateWindow::default(),
        tie_break: TieBreak::ReadOrder,
    }
}

fn forecast_config(processed: &Path, predict: &Path, horizon: usize) -> ForecastConfig {
    ForecastConfig {
        input: None,
        processed_dir: processed.to_path_buf(),
        predict_dir: predict.to_path_buf(),
        features: FeatureSpec::default(),
        model: ModelConfig::default(),
        horizon,
        step: TimeDelta::hours(1),
        evaluate: true,
        export_evaluation: None,
        plot: false,
        plot_width: 80,
        plot_height: 20,
    }
}

fn dirs(root: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let raw = root.join("raw");
    fs::create_dir_all(&raw).unwrap();
    (raw, root.join("processed"), root.join("predict"))
}

#[test]
fn overlapping_station_extracts_consolidate_to_one_row_per_hour() {
    let tmp = tempfile::tempdir().unwrap();
    let (raw, processed, _) = dirs(tmp.path());
    write_extract(&raw, "a.csv", "A", 1..=12);
    write_extract(&raw, "b.csv", "B", 6..=18);
    write_extract(&raw, "c.csv", "C", 13..=24);

    let out = run_ingest(&ingest_config(&raw, &processed), "first").unwrap();
    let table = out.store.snapshot();
    assert_eq!(table.len(), 24);
    assert_eq!(out.ingested.duplicates, 13);

    let ts = table.timestamps();
    assert!(ts.windows(2).all(|w| w[0] < w[1]));
    let last = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(ts.last(), Some(&last));

    let again = run_ingest(&ingest_config(&raw, &processed), "second").unwrap();
    let first_text = fs::read_to_string(&out.written).unwrap();
    let second_text = fs::read_to_string(&again.written).unwrap();
    assert_ne!(out.written, again.written);
    assert_eq!(first_text, second_text);
}

#[test]
fn date_window_limits_the_consolidated_series() {
    let tmp = tempfile::tempdir().unwrap();
    let (raw, processed, _) = dirs(tmp.path());
    write_extract(&raw, "a.csv", "A", 1..=24);

    let mut config = ingest_config(&raw, &processed);
    config.window = DateWindow {
        start: None,
        end: NaiveDate::from_ymd_opt(2024, 4, 1),
    };
    let out = run_ingest(&config, "window").unwrap();
    // Hour 24 belongs to the next calendar day.
    assert_eq!(out.store.snapshot().len(), 23);
}

#[test]
fn empty_raw_directory_is_an_input_error() {
    let tmp = tempfile::tempdir().unwrap();
    let (raw, processed, _) = dirs(tmp.path());
    let err = run_ingest(&ingest_config(&raw, &processed), "empty").unwrap_err();
    assert!(matches!(err, AppError::EmptyInput { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn one_day_of_data_forecasts_without_evaluation() {
    let tmp = tempfile::tempdir().unwrap();
    let (raw, processed, predict) = dirs(tmp.path());
    write_extract(&raw, "a.csv", "A", 1..=12);
    write_extract(&raw, "b.csv", "B", 6..=18);
    write_extract(&raw, "c.csv", "C", 13..=24);
    run_ingest(&ingest_config(&raw, &processed), "day").unwrap();

    let mut config = forecast_config(&processed, &predict, 6);
    let eval_path = tmp.path().join("eval").join("evaluation.json");
    config.export_evaluation = Some(eval_path.clone());
    let out = run_forecast(&config, "day").unwrap();

    assert_eq!(out.forecast.len(), 6);
    assert!(out.forecast.windows(2).all(|w| w[1].ds - w[0].ds == TimeDelta::hours(1)));
    assert!(out.forecast.iter().all(|p| p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper));
    let last_obs = *out.prepared.frame.timestamps.last().unwrap();
    assert_eq!(out.forecast[0].ds, last_obs + TimeDelta::hours(1));

    // Channels no extract reports are entirely blank and get dropped.
    assert!(out.prepared.warnings.iter().any(|w| w.column == "SO2" && w.missing_ratio == 1.0));
    assert_eq!(out.prepared.schema.numeric, vec!["WS".to_string(), "TEMP".to_string()]);
    assert!(matches!(out.evaluation, Some(Evaluation::Unavailable(_))));

    let csv_text = fs::read_to_string(&out.written).unwrap();
    let lines: Vec<&str> = csv_text.lines().collect();
    assert_eq!(lines[0], "ds,yhat,yhat_lower,yhat_upper");
    assert_eq!(lines.len(), 7);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&eval_path).unwrap()).unwrap();
    assert_eq!(json["evaluation"]["status"], "unavailable");
}

#[test]
fn sample_extracts_run_through_the_whole_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let (raw, processed, predict) = dirs(tmp.path());
    let sample = SampleConfig {
        raw_dir: raw.clone(),
        stations: vec!["S001".to_string(), "S002".to_string(), "S003".to_string()],
        start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        days: 10,
        seed: 11,
        gap_prob: 0.02,
    };
    let files = run_sample(&sample, "sample").unwrap();
    assert_eq!(files.len(), 3);

    let ingested = run_ingest(&ingest_config(&raw, &processed), "sample").unwrap();
    assert_eq!(ingested.store.snapshot().len(), 240);

    let out = run_forecast(&forecast_config(&processed, &predict, 24), "sample").unwrap();
    assert_eq!(out.forecast.len(), 24);
    assert!(out.forecast.iter().all(|p| p.yhat.is_finite() && p.yhat_lower <= p.yhat_upper));
    assert_eq!(out.prepared.frame.regressors.columns, out.model.schema().columns());
    // Hydrocarbon channels are almost never reported.
    assert!(out.prepared.schema.dropped.iter().any(|c| c == "CH4"));

    match out.evaluation {
        Some(Evaluation::Available(report)) => {
            assert!(report.folds >= 1);
            assert!(report.metrics.iter().all(|m| m.rmse.is_finite() && (0.0..=1.0).contains(&m.coverage)));
        }
        other => panic!("expected an evaluation report, got {other:?}"),
    }
}
