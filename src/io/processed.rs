//! Consolidated series persistence.
//!
//! The ingest stage writes one `consolidated_<stamp>.csv` per run in canonical
//! column order; the forecast stage reloads the newest one (or an explicit path).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::domain::{DATETIME, DATETIME_FMT, Observation, ObservationTable, SKT_DATE, SKT_TIME};
use crate::error::AppError;
use crate::io::discover::find_csv_files;
use crate::io::ingest::{build_header_map, get_optional, normalize_header_name, parse_date};

const FILE_PREFIX: &str = "consolidated_";

/// Write the consolidated series to `<dir>/consolidated_<stamp>.csv`.
pub fn write_consolidated(dir: &Path, table: &ObservationTable, stamp: &str) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;
    let path = dir.join(format!("{FILE_PREFIX}{stamp}.csv"));

    let mut writer = csv::Writer::from_path(&path).map_err(|e| AppError::csv(&path, e))?;

    let header: Vec<&str> = [DATETIME, SKT_DATE, SKT_TIME]
        .into_iter()
        .chain(table.columns.iter().map(String::as_str))
        .collect();
    writer.write_record(&header).map_err(|e| AppError::csv(&path, e))?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.timestamp.format(DATETIME_FMT).to_string());
        record.push(row.date.format("%Y-%m-%d").to_string());
        record.push(row.time.clone());
        for idx in 0..table.columns.len() {
            record.push(row.values.get(idx).cloned().flatten().unwrap_or_default());
        }
        writer.write_record(&record).map_err(|e| AppError::csv(&path, e))?;
    }
    writer.flush().map_err(|e| AppError::io(&path, e))?;

    Ok(path)
}

/// Reload a consolidated series.
///
/// Every column other than `DATETIME`, `SKT_DATE` and `SKT_TIME` becomes a value
/// column. Timestamps must be strictly increasing.
pub fn read_consolidated(path: &Path) -> Result<ObservationTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::csv(path, e))?;

    let headers = reader.headers().map_err(|e| AppError::csv(path, e))?.clone();
    let header_map = build_header_map(&headers);

    let dt_key = normalize_header_name(DATETIME);
    let Some(&dt_idx) = header_map.get(&dt_key) else {
        return Err(AppError::Data(format!(
            "'{}' has no `{DATETIME}` column; not a consolidated series.",
            path.display()
        )));
    };

    let reserved = [dt_key, normalize_header_name(SKT_DATE), normalize_header_name(SKT_TIME)];
    let value_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| {
            headers
                .get(i)
                .map(|h| !reserved.contains(&normalize_header_name(h)))
                .unwrap_or(false)
        })
        .collect();

    let columns = value_idx
        .iter()
        .filter_map(|&i| headers.get(i))
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut table = ObservationTable::new(columns);

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::csv(path, e))?;

        let raw_ts = record.get(dt_idx).map(str::trim).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts)
            .map_err(|e| AppError::Data(format!("{} line {line}: {e}", path.display())))?;

        let date = match get_optional(&record, &header_map, &reserved[1]) {
            Some(s) => parse_date(s).map_err(|e| AppError::Data(format!("{} line {line}: {e}", path.display())))?,
            None => timestamp.date(),
        };
        let time = get_optional(&record, &header_map, &reserved[2])
            .map(str::to_string)
            .unwrap_or_else(|| timestamp.format("%H:%M").to_string());

        if let Some(prev) = table.last_timestamp() {
            if timestamp <= prev {
                return Err(AppError::Data(format!(
                    "{} line {line}: timestamp {timestamp} is not after {prev}; the series must be strictly increasing.",
                    path.display()
                )));
            }
        }

        let values = value_idx
            .iter()
            .map(|&i| {
                record
                    .get(i)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .collect();

        table.rows.push(Observation {
            timestamp,
            date,
            time,
            station: None,
            values,
        });
    }

    Ok(table)
}

/// Newest `consolidated_*.csv` in `dir` (stamps sort lexicographically).
pub fn latest_consolidated(dir: &Path) -> Result<PathBuf, AppError> {
    find_csv_files(dir)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(FILE_PREFIX))
                .unwrap_or(false)
        })
        .max()
        .ok_or_else(|| {
            AppError::Config(format!(
                "No consolidated series found in '{}'. Run `aq ingest` first or pass --input.",
                dir.display()
            ))
        })
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    const FMTS: [&str; 3] = [DATETIME_FMT, "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];
    for fmt in FMTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    Err(format!("Invalid timestamp '{s}'. Expected YYYY-MM-DD HH:MM:SS."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_accept_minute_and_iso_forms() {
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-02 03:00:00"), Ok(expected));
        assert_eq!(parse_timestamp("2024-01-02 03:00"), Ok(expected));
        assert_eq!(parse_timestamp("2024-01-02T03:00:00"), Ok(expected));
        assert!(parse_timestamp("yesterday").is_err());
    }
}
