//! Raw extract ingest and consolidation.
//!
//! This module turns a directory of heterogeneous per-station CSV extracts into
//! one ordered hourly series with exactly one row per timestamp.
//!
//! Design goals:
//! - **Tolerant schema**: measurement columns absent from a file are missing
//!   values for its rows, never a fatal mismatch
//! - **Row-level validation**: rows with unusable date/hour fields are skipped
//!   and reported, the rest of the file is kept
//! - **Deterministic behavior**: files are read in sorted path order and the
//!   duplicate tie-break is an explicit rule (`TieBreak`)
//! - **Separation of concerns**: no imputation or modeling here

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{MEASUREMENT_COLUMNS, Observation, ObservationTable, SKT_CD, SKT_DATE, SKT_TIME, TieBreak};
use crate::error::AppError;
use crate::io::discover::require_csv_files;

/// One station's reading for one calendar date and hour slot (1-24).
#[derive(Debug, Clone, PartialEq)]
pub struct RawStationRecord {
    pub station: Option<String>,
    pub date: NaiveDate,
    pub hour: u32,
    /// Cell values aligned with `MEASUREMENT_COLUMNS`.
    pub values: Vec<Option<String>>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

/// Rows parsed from one extract.
#[derive(Debug, Clone, Default)]
pub struct ExtractRows {
    pub records: Vec<RawStationRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Measurement columns the file does not carry.
    pub missing_columns: Vec<String>,
}

/// Ingest output: consolidated series + bookkeeping for the run summary.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub table: ObservationTable,
    pub files: Vec<PathBuf>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Source rows discarded because another row won the same timestamp.
    pub duplicates: usize,
}

/// Read every extract in `raw_dir` and consolidate them.
///
/// Fails with `EmptyInput` when the directory holds no `*.csv` files.
pub fn load_raw_extracts(raw_dir: &Path, tie_break: &TieBreak) -> Result<IngestedData, AppError> {
    let files = require_csv_files(raw_dir)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for path in &files {
        let extract = read_extract(path)?;
        if !extract.missing_columns.is_empty() {
            debug!(
                file = %path.display(),
                missing = ?extract.missing_columns,
                "extract lacks measurement columns; treating them as missing"
            );
        }
        rows_read += extract.rows_read;
        records.extend(extract.records);
        row_errors.extend(extract.row_errors);
    }

    for err in &row_errors {
        warn!(file = %err.file.display(), line = err.line, "skipped row: {}", err.message);
    }

    let (table, duplicates) = consolidate(records, tie_break);
    info!(
        files = files.len(),
        rows_read,
        rows_used = table.len(),
        duplicates,
        skipped = row_errors.len(),
        "consolidated raw extracts"
    );

    Ok(IngestedData {
        table,
        files,
        row_errors,
        rows_read,
        duplicates,
    })
}

/// Parse one raw extract.
///
/// Only I/O and header failures are errors; bad rows end up in `row_errors`.
pub fn read_extract(path: &Path) -> Result<ExtractRows, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| AppError::csv(path, e))?.clone();
    let header_map = build_header_map(&headers);

    let mut out = ExtractRows::default();

    for required in [SKT_DATE, SKT_TIME] {
        if !header_map.contains_key(&normalize_header_name(required)) {
            out.row_errors.push(RowError {
                file: path.to_path_buf(),
                line: 1,
                message: format!("Missing required column `{required}`; file skipped."),
            });
        }
    }
    if !out.row_errors.is_empty() {
        return Ok(out);
    }

    let column_idx: Vec<Option<usize>> = MEASUREMENT_COLUMNS
        .iter()
        .map(|name| header_map.get(&normalize_header_name(name)).copied())
        .collect();
    out.missing_columns = MEASUREMENT_COLUMNS
        .iter()
        .zip(&column_idx)
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        out.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                out.row_errors.push(RowError {
                    file: path.to_path_buf(),
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_record(&record, &header_map, &column_idx) {
            Ok(row) => out.records.push(row),
            Err(message) => out.row_errors.push(RowError {
                file: path.to_path_buf(),
                line,
                message,
            }),
        }
    }

    Ok(out)
}

fn parse_record(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    column_idx: &[Option<usize>],
) -> Result<RawStationRecord, String> {
    let date = parse_date(get_required(record, header_map, "skt_date")?)?;
    let hour = parse_hour_code(get_required(record, header_map, "skt_time")?)?;
    let station = get_optional(record, header_map, &normalize_header_name(SKT_CD)).map(str::to_string);

    let values = column_idx
        .iter()
        .map(|idx| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();

    Ok(RawStationRecord {
        station,
        date,
        hour,
        values,
    })
}

/// Parse an hour code in `1..=24`.
///
/// Accepted forms: `7`, `07`, `7.0`, `07:00`, `24:00`.
pub fn parse_hour_code(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let hour_part = match s.split_once(':') {
        Some((h, m)) => {
            if m.trim().parse::<u32>() != Ok(0) {
                return Err(format!("Invalid hour code '{s}': minutes must be 00."));
            }
            h.trim()
        }
        None => s,
    };

    let hour = match hour_part.parse::<u32>() {
        Ok(h) => h,
        Err(_) => {
            let v = hour_part
                .parse::<f64>()
                .map_err(|_| format!("Invalid hour code '{s}'."))?;
            if v.fract() != 0.0 || v < 0.0 {
                return Err(format!("Invalid hour code '{s}'."));
            }
            v as u32
        }
    };

    if !(1..=24).contains(&hour) {
        return Err(format!("Hour code {hour} out of range (expected 1-24)."));
    }
    Ok(hour)
}

/// Map a calendar date and hour code to the canonical `(date, "HH:00", timestamp)`.
///
/// Hour 24 means the end of `date`: it becomes `00:00` on the following day.
pub fn normalize_hour(date: NaiveDate, hour: u32) -> Option<(NaiveDate, String, NaiveDateTime)> {
    let (date, hour) = if hour == 24 { (date.succ_opt()?, 0) } else { (date, hour) };
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    Some((date, format!("{hour:02}:00"), date.and_time(time)))
}

/// Merge raw rows into one series, ascending by timestamp, one row per timestamp.
///
/// Rows are sorted by `(timestamp, tie-break rank)` with a stable sort, so input
/// order breaks the remaining ties; the last row of each timestamp group wins.
/// Returns the table and the number of discarded duplicates.
pub fn consolidate(records: Vec<RawStationRecord>, tie_break: &TieBreak) -> (ObservationTable, usize) {
    let total = records.len();

    let mut keyed = Vec::with_capacity(total);
    for record in records {
        let Some((date, time, timestamp)) = normalize_hour(record.date, record.hour) else {
            warn!(date = %record.date, hour = record.hour, "cannot normalize timestamp; row skipped");
            continue;
        };
        let rank = tie_break.rank(record.station.as_deref());
        keyed.push((timestamp, rank, date, time, record));
    }
    let normalized = keyed.len();

    keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut table = ObservationTable::new(MEASUREMENT_COLUMNS.iter().map(|s| s.to_string()).collect());
    for (timestamp, _, date, time, record) in keyed {
        let row = Observation {
            timestamp,
            date,
            time,
            station: record.station,
            values: record.values,
        };
        match table.rows.last_mut() {
            Some(last) if last.timestamp == timestamp => *last = row,
            _ => table.rows.push(row),
        }
    }

    let duplicates = normalized - table.len();
    (table, duplicates)
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for repeated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

pub(crate) fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

pub(crate) fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO dates are the norm, but spreadsheet round-trips produce slashes,
    // compact dates, or a trailing midnight time.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d/%m/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, YYYYMMDD, DD/MM/YYYY."
    ))
}
