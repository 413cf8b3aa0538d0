//! Shared stage logic used by every front-end command.
//!
//! Ingest: raw extracts -> consolidated series -> date window -> processed CSV
//!
//! Forecast: processed CSV -> features -> fit -> future frame -> forecast CSV
//! -> cross-validation -> optional evaluation JSON
//!
//! Each stage returns everything it computed so callers only do presentation.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::info;

use crate::domain::{ForecastConfig, ForecastPoint, IngestConfig};
use crate::error::AppError;
use crate::evaluate::{Evaluation, evaluate};
use crate::features::{PreparedFeatures, prepare_features};
use crate::fit::ForecastModel;
use crate::forecast::{extract_horizon, make_future_frame};
use crate::io::{
    IngestedData, latest_consolidated, load_raw_extracts, read_consolidated, write_consolidated,
    write_evaluation_json, write_prediction_csv,
};
use crate::store::{ObservationStore, retain_window};

/// Observed points shown before the forecast in the terminal plot.
const PLOT_HISTORY_POINTS: usize = 72;

/// Outputs of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    pub ingested: IngestedData,
    /// Consolidated series after the date window.
    pub store: ObservationStore,
    pub written: PathBuf,
}

/// Outputs of one forecast run.
#[derive(Debug, Clone)]
pub struct ForecastOutput {
    pub input: PathBuf,
    pub prepared: PreparedFeatures,
    pub model: ForecastModel,
    /// Exactly `horizon` rows, ascending.
    pub forecast: Vec<ForecastPoint>,
    pub written: PathBuf,
    pub evaluation: Option<Evaluation>,
    /// Trailing observed targets, for plotting.
    pub history: Vec<(NaiveDateTime, f64)>,
}

pub fn run_ingest(config: &IngestConfig, stamp: &str) -> Result<IngestOutput, AppError> {
    let ingested = load_raw_extracts(&config.raw_dir, &config.tie_break)?;

    let mut store = ObservationStore::new(ingested.table.clone());
    if !config.window.is_unbounded() {
        store = retain_window(&store, config.window);
        info!(
            start = ?config.window.start,
            end = ?config.window.end,
            retained = store.snapshot().len(),
            "date window applied"
        );
    }
    if store.snapshot().is_empty() {
        return Err(AppError::Data("No observations remain after consolidation.".to_string()));
    }

    let written = write_consolidated(&config.processed_dir, store.snapshot(), stamp)?;
    info!(rows = store.snapshot().len(), path = %written.display(), "consolidated series saved");

    Ok(IngestOutput {
        ingested,
        store,
        written,
    })
}

pub fn run_forecast(config: &ForecastConfig, stamp: &str) -> Result<ForecastOutput, AppError> {
    let input = match &config.input {
        Some(path) => path.clone(),
        None => latest_consolidated(&config.processed_dir)?,
    };
    info!(path = %input.display(), "loading consolidated series");
    let table = read_consolidated(&input)?;

    let prepared = prepare_features(&table, &config.features)?;
    let model = ForecastModel::fit(&prepared.frame, &prepared.schema, &config.model)?;

    let future = make_future_frame(&model, &prepared.frame, config.horizon, config.step)?;
    let mut scored = model.predict(&prepared.frame.timestamps, &prepared.frame.regressors)?;
    scored.extend(model.predict(&future.timestamps, &future.regressors)?);
    let forecast = extract_horizon(&scored, config.horizon);

    let written = write_prediction_csv(&config.predict_dir, &forecast, stamp)?;
    info!(rows = forecast.len(), path = %written.display(), "forecast saved");

    let evaluation = if config.evaluate {
        Some(evaluate(&prepared.frame, &model, &config.model)?)
    } else {
        None
    };

    if let (Some(path), Some(eval)) = (&config.export_evaluation, &evaluation) {
        let generated_at = chrono::Local::now().naive_local();
        write_evaluation_json(path, &prepared.frame.target_name, generated_at, eval)?;
        info!(path = %path.display(), "evaluation saved");
    }

    let history = observed_tail(&prepared, PLOT_HISTORY_POINTS);

    Ok(ForecastOutput {
        input,
        prepared,
        model,
        forecast,
        written,
        evaluation,
        history,
    })
}

fn observed_tail(prepared: &PreparedFeatures, n: usize) -> Vec<(NaiveDateTime, f64)> {
    let frame = &prepared.frame;
    let observed: Vec<(NaiveDateTime, f64)> = frame
        .timestamps
        .iter()
        .zip(&frame.target)
        .filter_map(|(&t, y)| y.filter(|v| v.is_finite()).map(|v| (t, v)))
        .collect();
    let start = observed.len().saturating_sub(n);
    observed[start..].to_vec()
}
