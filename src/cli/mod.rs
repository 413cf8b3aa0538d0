//! Command-line parsing for the air-quality forecaster.
//!
//! Parsing and dispatch stay separate from the pipeline code: every command is
//! converted once into a plain config struct (see `app`).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::Seasonality;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "aq", version, about = "PM2.5 consolidation and forecasting")]
pub struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, env = "AQ_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest raw extracts, then train, forecast and evaluate (default).
    Run(RunArgs),
    /// Consolidate raw station extracts into one hourly series.
    Ingest(IngestArgs),
    /// Train on a consolidated series, forecast and evaluate.
    Forecast(ForecastArgs),
    /// Download station extracts from the Soramame API.
    Fetch(FetchArgs),
    /// Write synthetic station extracts for offline runs.
    Sample(SampleArgs),
}

/// Data directories shared by the pipeline stages.
#[derive(Debug, Args, Clone)]
pub struct DirArgs {
    /// Directory of raw per-station CSV extracts.
    #[arg(long, env = "AQ_RAW_DIR", default_value = "data/raw")]
    pub raw_dir: PathBuf,

    /// Directory for consolidated series.
    #[arg(long, env = "AQ_PROCESSED_DIR", default_value = "data/processed")]
    pub processed_dir: PathBuf,

    /// Directory for forecast outputs.
    #[arg(long, env = "AQ_PREDICT_DIR", default_value = "data/predict")]
    pub predict_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TieBreakArg {
    /// Last row in read order wins.
    ReadOrder,
    /// Earliest station in `--station-priority` wins.
    StationPriority,
}

/// Ingestion options.
#[derive(Debug, Args, Clone)]
pub struct IngestOpts {
    /// First calendar date kept (YYYY-MM-DD).
    #[arg(long, env = "AQ_START")]
    pub start: Option<NaiveDate>,

    /// Last calendar date kept (YYYY-MM-DD).
    #[arg(long, env = "AQ_END")]
    pub end: Option<NaiveDate>,

    /// Rule for rows that share a timestamp.
    #[arg(long, env = "AQ_TIE_BREAK", value_enum, default_value_t = TieBreakArg::ReadOrder)]
    pub tie_break: TieBreakArg,

    /// Station codes, highest priority first (comma separated).
    #[arg(long, env = "AQ_STATION_PRIORITY", value_delimiter = ',')]
    pub station_priority: Vec<String>,
}

/// Feature, model and output options.
#[derive(Debug, Args, Clone)]
pub struct ForecastOpts {
    /// Target column.
    #[arg(long, env = "AQ_TARGET", default_value = crate::domain::DEFAULT_TARGET)]
    pub target: String,

    /// Numeric regressor candidates (comma separated). Defaults to the full pollutant and weather set.
    #[arg(long, env = "AQ_NUMERIC", value_delimiter = ',')]
    pub numeric: Option<Vec<String>>,

    /// Categorical regressor candidates (comma separated). Defaults to `WD`.
    #[arg(long, env = "AQ_CATEGORICAL", value_delimiter = ',')]
    pub categorical: Option<Vec<String>>,

    /// Drop regressors whose missing ratio is at or above this value.
    #[arg(long, env = "AQ_MISSING_THRESHOLD", default_value_t = 0.8)]
    pub missing_threshold: f64,

    /// Number of future steps to forecast.
    #[arg(long, env = "AQ_HORIZON", default_value_t = 24)]
    pub horizon: usize,

    /// Spacing of future steps (e.g. `1h`, `30m`).
    #[arg(long, env = "AQ_STEP", default_value = "1h")]
    pub step: String,

    /// Coverage of the predictive interval.
    #[arg(long, env = "AQ_INTERVAL_WIDTH", default_value_t = 0.8)]
    pub interval_width: f64,

    /// Number of potential trend changepoints.
    #[arg(long, env = "AQ_N_CHANGEPOINTS", default_value_t = 25)]
    pub n_changepoints: usize,

    /// Fraction of the history eligible for changepoints.
    #[arg(long, env = "AQ_CHANGEPOINT_RANGE", default_value_t = 0.8)]
    pub changepoint_range: f64,

    /// Prior scale of trend changes (smaller is stiffer).
    #[arg(long, env = "AQ_CHANGEPOINT_PRIOR_SCALE", default_value_t = 0.05)]
    pub changepoint_prior_scale: f64,

    /// Prior scale of seasonal terms.
    #[arg(long, env = "AQ_SEASONALITY_PRIOR_SCALE", default_value_t = 10.0)]
    pub seasonality_prior_scale: f64,

    /// Prior scale of regressor coefficients.
    #[arg(long, env = "AQ_REGRESSOR_PRIOR_SCALE", default_value_t = 10.0)]
    pub regressor_prior_scale: f64,

    #[arg(long, env = "AQ_YEARLY", value_enum, default_value_t = Seasonality::Auto)]
    pub yearly: Seasonality,

    #[arg(long, env = "AQ_WEEKLY", value_enum, default_value_t = Seasonality::Auto)]
    pub weekly: Seasonality,

    #[arg(long, env = "AQ_DAILY", value_enum, default_value_t = Seasonality::Auto)]
    pub daily: Seasonality,

    /// Skip cross-validation.
    #[arg(long, env = "AQ_NO_EVAL")]
    pub no_eval: bool,

    /// Write the evaluation outcome to this JSON file.
    #[arg(long, env = "AQ_EXPORT_EVALUATION")]
    pub export_evaluation: Option<PathBuf>,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, env = "AQ_PLOT", default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long, env = "AQ_NO_PLOT")]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, env = "AQ_PLOT_WIDTH", default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, env = "AQ_PLOT_HEIGHT", default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub dirs: DirArgs,
    #[command(flatten)]
    pub ingest: IngestOpts,
    #[command(flatten)]
    pub forecast: ForecastOpts,
}

#[derive(Debug, Args, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub dirs: DirArgs,
    #[command(flatten)]
    pub ingest: IngestOpts,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// Consolidated CSV to train on. Defaults to the newest file in the processed directory.
    #[arg(long, env = "AQ_INPUT")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub forecast: ForecastOpts,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Directory the extracts are written to.
    #[arg(long, env = "AQ_RAW_DIR", default_value = "data/raw")]
    pub raw_dir: PathBuf,

    /// Prefecture code (TDFKN_CD).
    #[arg(long, env = "AQ_PREFECTURE")]
    pub prefecture: String,

    /// Station codes (SKT_CD), comma separated.
    #[arg(long, env = "AQ_STATIONS", value_delimiter = ',', required = true)]
    pub stations: Vec<String>,

    /// First month (YYYYMM).
    #[arg(long, env = "AQ_START_YM")]
    pub start_ym: String,

    /// Last month (YYYYMM).
    #[arg(long, env = "AQ_END_YM")]
    pub end_ym: String,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Directory the extracts are written to.
    #[arg(long, env = "AQ_RAW_DIR", default_value = "data/raw")]
    pub raw_dir: PathBuf,

    /// Station codes to simulate (comma separated).
    #[arg(long, env = "AQ_SAMPLE_STATIONS", value_delimiter = ',', default_value = "S001,S002,S003")]
    pub stations: Vec<String>,

    /// First simulated date (YYYY-MM-DD).
    #[arg(long, env = "AQ_SAMPLE_START", default_value = "2024-01-01")]
    pub start: NaiveDate,

    /// Number of simulated days.
    #[arg(long, env = "AQ_SAMPLE_DAYS", default_value_t = 60)]
    pub days: usize,

    /// Random seed.
    #[arg(long, env = "AQ_SAMPLE_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Probability that a single reading is left blank.
    #[arg(long, env = "AQ_SAMPLE_GAP_PROB", default_value_t = 0.02)]
    pub gap_prob: f64,
}
