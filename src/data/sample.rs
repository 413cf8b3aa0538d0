//! Synthetic station extracts.
//!
//! Generates raw per-station CSVs shaped like real monitoring-network exports:
//! `SKT_CD`, `SKT_DATE`, `SKT_TIME` (hour codes 1-24) and the measurement
//! columns. Stations share one underlying hourly signal and add their own
//! noise; coverage windows overlap so consolidation has duplicates to resolve.
//!
//! PM2.5 follows a diurnal cycle, rises with temperature and falls with wind
//! speed. Hydrocarbon channels are mostly blank, as at most real stations.

use std::f64::consts::TAU;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::info;

use crate::domain::{MEASUREMENT_COLUMNS, SKT_CD, SKT_DATE, SKT_TIME, SampleConfig};
use crate::error::AppError;
use crate::io::normalize_hour;

const WIND_DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
/// Stations after the first start this many hours later than the previous one.
const COVERAGE_STAGGER_HOURS: usize = 12;
/// Channels that are almost never reported.
const SPARSE_CHANNELS: [&str; 4] = ["NMHC", "CH4", "THC", "SP"];
const SPARSE_REPORT_PROB: f64 = 0.05;

/// The shared hourly state all stations observe.
#[derive(Debug, Clone, Copy)]
struct HourState {
    temp: f64,
    hum: f64,
    ws: f64,
    wd: usize,
    pm25: f64,
}

/// One generated extract, ready to be written.
#[derive(Debug, Clone)]
pub struct StationExtract {
    pub station: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn generate_sample(config: &SampleConfig) -> Result<Vec<StationExtract>, AppError> {
    if config.stations.is_empty() {
        return Err(AppError::Config("Sample generation needs at least one station.".to_string()));
    }
    if config.days == 0 {
        return Err(AppError::Config("Sample day count must be > 0.".to_string()));
    }
    if !(0.0..1.0).contains(&config.gap_prob) {
        return Err(AppError::Config(format!(
            "Gap probability must be in [0, 1), got {}.",
            config.gap_prob
        )));
    }

    // Slots are (date, hour code 1..=24); each maps to one canonical timestamp.
    let mut slots = Vec::with_capacity(config.days * 24);
    for day in 0..config.days {
        let date = config
            .start
            .checked_add_days(chrono::Days::new(day as u64))
            .ok_or_else(|| AppError::Config("Sample date range overflows.".to_string()))?;
        for hour in 1..=24u32 {
            let (_, _, ts) = normalize_hour(date, hour)
                .ok_or_else(|| AppError::Config("Sample date range overflows.".to_string()))?;
            slots.push((date, hour, ts));
        }
    }

    let noise = Normal::new(0.0, 1.0).map_err(|e| AppError::Config(format!("Noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let states = simulate_states(&mut rng, &noise, slots.iter().map(|s| s.2));

    let mut header: Vec<String> = vec![SKT_CD.to_string(), SKT_DATE.to_string(), SKT_TIME.to_string()];
    header.extend(MEASUREMENT_COLUMNS.iter().map(|c| c.to_string()));

    let mut out = Vec::with_capacity(config.stations.len());
    for (k, station) in config.stations.iter().enumerate() {
        let mut station_rng = StdRng::seed_from_u64(station_seed(config.seed, k));
        let first = (k * COVERAGE_STAGGER_HOURS).min(slots.len().saturating_sub(1));

        let rows = slots[first..]
            .iter()
            .zip(&states[first..])
            .map(|(&(date, hour, _), state)| {
                let mut row = vec![
                    station.clone(),
                    date.format("%Y/%m/%d").to_string(),
                    hour.to_string(),
                ];
                row.extend(station_readings(&mut station_rng, &noise, state, config.gap_prob));
                row
            })
            .collect();

        out.push(StationExtract {
            station: station.clone(),
            header: header.clone(),
            rows,
        });
    }
    Ok(out)
}

fn simulate_states(
    rng: &mut StdRng,
    noise: &Normal<f64>,
    timestamps: impl Iterator<Item = NaiveDateTime>,
) -> Vec<HourState> {
    let mut wd = 0usize;
    let mut ws = 2.5_f64;
    let mut level = 0.0_f64;

    timestamps
        .map(|ts| {
            let h = ts.hour() as f64;
            let temp = 15.0 + 8.0 * (TAU * (h - 9.0) / 24.0).sin() + noise.sample(rng);
            let hum = (60.0 - 15.0 * (TAU * (h - 9.0) / 24.0).sin() + 3.0 * noise.sample(rng)).clamp(5.0, 100.0);

            ws = (0.8 * ws + 0.2 * 2.5 + 0.5 * noise.sample(rng)).max(0.1);
            if rng.gen_bool(0.1) {
                wd = if rng.gen_bool(0.5) { (wd + 1) % 8 } else { (wd + 7) % 8 };
            }

            // Slow-moving background level (AR(1)).
            level = 0.95 * level + 0.6 * noise.sample(rng);
            let pm25 = (12.0 + 5.0 * (TAU * (h - 20.0) / 24.0).sin() + 0.4 * (temp - 15.0) - 1.5 * (ws - 2.5)
                + level)
                .max(1.0);

            HourState { temp, hum, ws, wd, pm25 }
        })
        .collect()
}

fn station_readings(rng: &mut StdRng, noise: &Normal<f64>, s: &HourState, gap_prob: f64) -> Vec<String> {
    MEASUREMENT_COLUMNS
        .iter()
        .map(|&column| {
            if SPARSE_CHANNELS.contains(&column) && !rng.gen_bool(SPARSE_REPORT_PROB) {
                return String::new();
            }
            if gap_prob > 0.0 && rng.gen_bool(gap_prob) {
                return String::new();
            }
            let mut jitter = |scale: f64| scale * noise.sample(rng);
            match column {
                "PM2_5" => format!("{:.0}", (s.pm25 + jitter(1.5)).max(0.0)),
                "SPM" => format!("{:.0}", (1.4 * s.pm25 + jitter(3.0)).max(0.0)),
                "TEMP" => format!("{:.1}", s.temp + jitter(0.3)),
                "HUM" => format!("{:.0}", (s.hum + jitter(1.0)).clamp(0.0, 100.0)),
                "WS" => format!("{:.1}", (s.ws + jitter(0.2)).max(0.0)),
                "WD" => {
                    if s.ws < 0.3 {
                        "CALM".to_string()
                    } else {
                        WIND_DIRECTIONS[s.wd].to_string()
                    }
                }
                "SO2" => format!("{:.3}", (0.002 + jitter(0.0005)).max(0.0)),
                "NO" => format!("{:.3}", (0.004 + 0.0004 * s.pm25 + jitter(0.001)).max(0.0)),
                "NO2" => format!("{:.3}", (0.010 + 0.0008 * s.pm25 + jitter(0.002)).max(0.0)),
                "NOX" => format!("{:.3}", (0.014 + 0.0012 * s.pm25 + jitter(0.002)).max(0.0)),
                "CO" => format!("{:.1}", (0.3 + 0.01 * s.pm25 + jitter(0.05)).max(0.0)),
                "OX" => format!("{:.3}", (0.03 + 0.001 * (s.temp - 15.0) + jitter(0.004)).max(0.0)),
                "NMHC" => format!("{:.2}", (0.1 + jitter(0.02)).max(0.0)),
                "CH4" => format!("{:.2}", 1.95 + jitter(0.02)),
                "THC" => format!("{:.2}", 2.05 + jitter(0.03)),
                _ => format!("{:.1}", (s.pm25 + jitter(2.0)).max(0.0)),
            }
        })
        .collect()
}

/// Per-station seed, spread along the golden-ratio sequence.
fn station_seed(seed: u64, k: usize) -> u64 {
    seed.wrapping_add((k as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Write each extract to `<dir>/sample_<station>_<stamp>.csv`.
pub fn write_sample(dir: &Path, extracts: &[StationExtract], stamp: &str) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;
    let mut written = Vec::with_capacity(extracts.len());
    for extract in extracts {
        let path = dir.join(format!("sample_{}_{stamp}.csv", extract.station));
        let file = File::create(&path).map_err(|e| AppError::io(&path, e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(&extract.header).map_err(|e| AppError::csv(&path, e))?;
        for row in &extract.rows {
            writer.write_record(row).map_err(|e| AppError::csv(&path, e))?;
        }
        writer.flush().map_err(|e| AppError::io(&path, e))?;
        info!(station = %extract.station, rows = extract.rows.len(), path = %path.display(), "sample extract written");
        written.push(path);
    }
    Ok(written)
}

/// Generate and write the configured sample extracts.
pub fn run_sample(config: &SampleConfig, stamp: &str) -> Result<Vec<PathBuf>, AppError> {
    let extracts = generate_sample(config)?;
    write_sample(&config.raw_dir, &extracts, stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config(stations: &[&str], days: usize) -> SampleConfig {
        SampleConfig {
            raw_dir: PathBuf::from("unused"),
            stations: stations.iter().map(|s| s.to_string()).collect(),
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            days,
            seed: 7,
            gap_prob: 0.02,
        }
    }

    #[test]
    fn same_seed_same_output() {
        let a = generate_sample(&config(&["S1", "S2"], 2)).unwrap();
        let b = generate_sample(&config(&["S1", "S2"], 2)).unwrap();
        assert_eq!(a[0].rows, b[0].rows);
        assert_eq!(a[1].rows, b[1].rows);
    }

    #[test]
    fn coverage_is_staggered_and_hour_codes_run_1_to_24() {
        let extracts = generate_sample(&config(&["S1", "S2", "S3"], 2)).unwrap();
        assert_eq!(extracts[0].rows.len(), 48);
        assert_eq!(extracts[1].rows.len(), 36);
        assert_eq!(extracts[2].rows.len(), 24);

        let hours: Vec<&str> = extracts[0].rows[..24].iter().map(|r| r[2].as_str()).collect();
        assert_eq!(hours.first(), Some(&"1"));
        assert_eq!(hours.last(), Some(&"24"));
        assert_eq!(extracts[0].header.len(), 3 + MEASUREMENT_COLUMNS.len());
    }

    #[test]
    fn station_seeds_wrap_for_large_seeds_and_many_stations() {
        let seeds: Vec<u64> = (0..16).map(|k| station_seed(u64::MAX, k)).collect();
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), seeds.len());

        let names: Vec<String> = (0..6).map(|k| format!("S{k}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut cfg = config(&refs, 3);
        cfg.seed = u64::MAX;
        let extracts = generate_sample(&cfg).unwrap();
        assert_eq!(extracts.len(), 6);
        assert_ne!(extracts[0].rows[30][3..], extracts[1].rows[18][3..]);
    }

    #[test]
    fn rejects_empty_station_list_and_zero_days() {
        assert!(generate_sample(&config(&[], 2)).is_err());
        assert!(generate_sample(&config(&["S1"], 0)).is_err());
    }
}
