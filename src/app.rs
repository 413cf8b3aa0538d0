//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments into config structs
//! - runs the requested stages
//! - prints reports and plots

use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;

use crate::cli::{Command, DirArgs, FetchArgs, ForecastOpts, IngestOpts, SampleArgs, TieBreakArg};
use crate::domain::{
    DEFAULT_CATEGORICAL_REGRESSORS, DEFAULT_NUMERIC_REGRESSORS, DateWindow, FeatureSpec, FetchConfig,
    ForecastConfig, IngestConfig, ModelConfig, SampleConfig, TieBreak,
};
use crate::error::AppError;
use crate::io::run_stamp;

pub mod logging;
pub mod pipeline;

/// Entry point for the `aq` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    logging::init_tracing(cli.log_json);

    let stamp = run_stamp();
    match cli.command {
        Command::Run(args) => {
            let ingest = ingest_config_from_args(&args.dirs, &args.ingest)?;
            handle_ingest(&ingest, &stamp)?;
            let forecast = forecast_config_from_args(&args.dirs, None, &args.forecast)?;
            handle_forecast(&forecast, &stamp)
        }
        Command::Ingest(args) => {
            let config = ingest_config_from_args(&args.dirs, &args.ingest)?;
            handle_ingest(&config, &stamp)
        }
        Command::Forecast(args) => {
            let config = forecast_config_from_args(&args.dirs, args.input.clone(), &args.forecast)?;
            handle_forecast(&config, &stamp)
        }
        Command::Fetch(args) => handle_fetch(&args, &stamp),
        Command::Sample(args) => handle_sample(&args, &stamp),
    }
}

fn handle_ingest(config: &IngestConfig, stamp: &str) -> Result<(), AppError> {
    let out = pipeline::run_ingest(config, stamp)?;
    println!(
        "{}",
        crate::report::format_ingest_summary(&out.ingested, out.store.snapshot().len(), &out.written)
    );
    Ok(())
}

fn handle_forecast(config: &ForecastConfig, stamp: &str) -> Result<(), AppError> {
    let out = pipeline::run_forecast(config, stamp)?;

    println!("=== aq - forecast ===");
    println!("Input: {}", out.input.display());
    print!("{}", crate::report::format_feature_summary(&out.prepared));
    println!(
        "{}",
        crate::report::format_fit_summary(out.model.summary(), out.model.margin(), config.model.interval_width)
    );
    println!("{}", crate::report::format_forecast_table(&out.forecast));
    println!("Wrote: {}\n", out.written.display());

    if let Some(evaluation) = &out.evaluation {
        println!("{}", crate::report::format_evaluation(evaluation));
    }

    if config.plot {
        let plot =
            crate::plot::render_forecast_plot(&out.history, &out.forecast, config.plot_width, config.plot_height);
        println!("{plot}");
    }
    Ok(())
}

fn handle_fetch(args: &FetchArgs, stamp: &str) -> Result<(), AppError> {
    let config = FetchConfig {
        raw_dir: args.raw_dir.clone(),
        prefecture: args.prefecture.clone(),
        stations: args.stations.clone(),
        start_ym: args.start_ym.clone(),
        end_ym: args.end_ym.clone(),
    };
    let client = crate::data::soramame::SoramameClient::from_env()?;
    let written = crate::data::soramame::run_fetch(&config, &client, stamp)?;
    for path in &written {
        println!("Wrote: {}", path.display());
    }
    Ok(())
}

fn handle_sample(args: &SampleArgs, stamp: &str) -> Result<(), AppError> {
    let config = SampleConfig {
        raw_dir: args.raw_dir.clone(),
        stations: args.stations.clone(),
        start: args.start,
        days: args.days,
        seed: args.seed,
        gap_prob: args.gap_prob,
    };
    let written = crate::data::sample::run_sample(&config, stamp)?;
    for path in &written {
        println!("Wrote: {}", path.display());
    }
    Ok(())
}

pub fn ingest_config_from_args(dirs: &DirArgs, opts: &IngestOpts) -> Result<IngestConfig, AppError> {
    if let (Some(start), Some(end)) = (opts.start, opts.end) {
        if start > end {
            return Err(AppError::Config(format!("Start date {start} is after end date {end}.")));
        }
    }

    let tie_break = match opts.tie_break {
        TieBreakArg::ReadOrder => TieBreak::ReadOrder,
        TieBreakArg::StationPriority => {
            if opts.station_priority.is_empty() {
                return Err(AppError::Config(
                    "--tie-break station-priority needs --station-priority.".to_string(),
                ));
            }
            TieBreak::StationPriority(opts.station_priority.clone())
        }
    };

    Ok(IngestConfig {
        raw_dir: dirs.raw_dir.clone(),
        processed_dir: dirs.processed_dir.clone(),
        window: DateWindow {
            start: opts.start,
            end: opts.end,
        },
        tie_break,
    })
}

pub fn forecast_config_from_args(
    dirs: &DirArgs,
    input: Option<std::path::PathBuf>,
    opts: &ForecastOpts,
) -> Result<ForecastConfig, AppError> {
    let step = parse_step(&opts.step)?;

    Ok(ForecastConfig {
        input,
        processed_dir: dirs.processed_dir.clone(),
        predict_dir: dirs.predict_dir.clone(),
        features: FeatureSpec {
            target: opts.target.clone(),
            numeric: opts
                .numeric
                .clone()
                .unwrap_or_else(|| owned(&DEFAULT_NUMERIC_REGRESSORS)),
            categorical: opts
                .categorical
                .clone()
                .unwrap_or_else(|| owned(&DEFAULT_CATEGORICAL_REGRESSORS)),
            missing_threshold: opts.missing_threshold,
        },
        model: ModelConfig {
            n_changepoints: opts.n_changepoints,
            changepoint_range: opts.changepoint_range,
            changepoint_prior_scale: opts.changepoint_prior_scale,
            seasonality_prior_scale: opts.seasonality_prior_scale,
            regressor_prior_scale: opts.regressor_prior_scale,
            interval_width: opts.interval_width,
            yearly: opts.yearly,
            weekly: opts.weekly,
            daily: opts.daily,
        },
        horizon: opts.horizon,
        step,
        evaluate: !opts.no_eval,
        export_evaluation: opts.export_evaluation.clone(),
        plot: opts.plot && !opts.no_plot,
        plot_width: opts.width,
        plot_height: opts.height,
    })
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Parse a step such as `1h` or `30m`.
pub fn parse_step(s: &str) -> Result<TimeDelta, AppError> {
    let d: Duration =
        humantime::parse_duration(s).map_err(|e| AppError::Config(format!("Invalid step `{s}`: {e}")))?;
    let step = TimeDelta::from_std(d).map_err(|e| AppError::Config(format!("Step `{s}` out of range: {e}")))?;
    if step <= TimeDelta::zero() {
        return Err(AppError::Config("Step granularity must be positive.".to_string()));
    }
    Ok(step)
}

/// Rewrite argv so `aq` defaults to `aq run`.
///
/// Rules:
/// - `aq`                        -> `aq run`
/// - `aq --horizon 48 ...`       -> `aq run --horizon 48 ...`
/// - `aq --help/--version/-h`    -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "ingest" | "forecast" | "fetch" | "sample");
    if !is_subcommand && arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, RunArgs};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_the_whole_pipeline() {
        assert_eq!(rewrite_args(argv(&["aq"])), argv(&["aq", "run"]));
        assert_eq!(
            rewrite_args(argv(&["aq", "--horizon", "48"])),
            argv(&["aq", "run", "--horizon", "48"])
        );
        assert_eq!(rewrite_args(argv(&["aq", "ingest"])), argv(&["aq", "ingest"]));
        assert_eq!(rewrite_args(argv(&["aq", "--help"])), argv(&["aq", "--help"]));
    }

    #[test]
    fn steps_parse_with_humantime() {
        assert_eq!(parse_step("1h").unwrap(), TimeDelta::hours(1));
        assert_eq!(parse_step("30m").unwrap(), TimeDelta::minutes(30));
        assert!(parse_step("0s").is_err());
        assert!(parse_step("soon").is_err());
    }

    #[test]
    fn run_args_become_configs() {
        let cli = Cli::parse_from(rewrite_args(argv(&["aq", "--horizon", "6", "--no-plot", "--numeric", "TEMP,WS"])));
        let Command::Run(RunArgs { dirs, ingest, forecast }) = cli.command else {
            panic!("expected run");
        };
        let ic = ingest_config_from_args(&dirs, &ingest).unwrap();
        assert_eq!(ic.tie_break, TieBreak::ReadOrder);
        assert!(ic.window.is_unbounded());

        let fc = forecast_config_from_args(&dirs, None, &forecast).unwrap();
        assert_eq!(fc.horizon, 6);
        assert!(!fc.plot);
        assert_eq!(fc.features.numeric, vec!["TEMP".to_string(), "WS".to_string()]);
        assert_eq!(fc.features.categorical, vec!["WD".to_string()]);
        assert_eq!(fc.step, TimeDelta::hours(1));
    }

    #[test]
    fn station_priority_needs_a_list() {
        let cli = Cli::parse_from(argv(&["aq", "ingest", "--tie-break", "station-priority"]));
        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert!(ingest_config_from_args(&args.dirs, &args.ingest).is_err());
    }
}
