//! Soramame (Japanese air-quality monitoring network) API client.
//!
//! One request per station; the JSON array response is flattened into a raw
//! per-station extract that the ingest stage reads like any other file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::domain::{FetchConfig, MEASUREMENT_COLUMNS};
use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://soramame.env.go.jp/soramame/api/data_search";
const BASE_URL_ENV: &str = "SORAMAME_BASE_URL";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One JSON object of the API response.
pub type ApiRow = Map<String, Value>;

pub struct SoramameClient {
    client: Client,
    base_url: String,
}

impl SoramameClient {
    /// Build a client; `SORAMAME_BASE_URL` (environment or `.env`) overrides the endpoint.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Fetch(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch every hourly row of one station between two `YYYYMM` months.
    pub fn fetch_station(
        &self,
        prefecture: &str,
        station: &str,
        start_ym: &str,
        end_ym: &str,
    ) -> Result<Vec<ApiRow>, AppError> {
        let request_data = MEASUREMENT_COLUMNS.join(",");
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("Start_YM", start_ym),
                ("End_YM", end_ym),
                ("TDFKN_CD", prefecture),
                ("SKT_CD", station),
                ("REQUEST_DATA", request_data.as_str()),
            ])
            .send()
            .map_err(|e| AppError::Fetch(format!("Request for station {station} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Fetch(format!(
                "Request for station {station} failed with status {}.",
                resp.status()
            )));
        }

        resp.json::<Vec<ApiRow>>()
            .map_err(|e| AppError::Fetch(format!("Failed to parse response for station {station}: {e}")))
    }
}

/// Check a `YYYYMM` month code.
pub fn validate_ym(ym: &str) -> Result<(), AppError> {
    let ok = ym.len() == 6
        && ym.bytes().all(|b| b.is_ascii_digit())
        && matches!(ym[4..].parse::<u32>(), Ok(1..=12));
    if ok {
        Ok(())
    } else {
        Err(AppError::Config(format!("Invalid month `{ym}`; expected YYYYMM.")))
    }
}

/// Column union in first-seen order, and each row's cells aligned to it.
pub fn flatten_rows(rows: &[ApiRow]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }

    let records = rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|key| row.get(key).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    (header, records)
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write one station's rows to `<dir>/<pref>_<station>_<stamp>.csv`.
pub fn write_station_csv(
    dir: &Path,
    prefecture: &str,
    station: &str,
    stamp: &str,
    rows: &[ApiRow],
) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;
    let path = dir.join(format!("{prefecture}_{station}_{stamp}.csv"));
    let file = File::create(&path).map_err(|e| AppError::io(&path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    let (header, records) = flatten_rows(rows);
    writer.write_record(&header).map_err(|e| AppError::csv(&path, e))?;
    for record in &records {
        writer.write_record(record).map_err(|e| AppError::csv(&path, e))?;
    }
    writer.flush().map_err(|e| AppError::io(&path, e))?;
    Ok(path)
}

/// Fetch every configured station into the raw directory.
///
/// A station whose request fails or returns no rows is logged and skipped.
/// The run fails only when every requested station failed.
pub fn run_fetch(config: &FetchConfig, client: &SoramameClient, stamp: &str) -> Result<Vec<PathBuf>, AppError> {
    validate_ym(&config.start_ym)?;
    validate_ym(&config.end_ym)?;
    if config.start_ym > config.end_ym {
        return Err(AppError::Config(format!(
            "Start month {} is after end month {}.",
            config.start_ym, config.end_ym
        )));
    }
    if config.stations.is_empty() {
        return Err(AppError::Config("No station codes given.".to_string()));
    }

    let mut written = Vec::new();
    let mut failed = Vec::new();
    for station in &config.stations {
        let rows = match client.fetch_station(&config.prefecture, station, &config.start_ym, &config.end_ym) {
            Ok(rows) => rows,
            Err(AppError::Fetch(reason)) => {
                warn!(station = %station, %reason, "station fetch failed; skipped");
                failed.push(station.as_str());
                continue;
            }
            Err(e) => return Err(e),
        };
        if rows.is_empty() {
            warn!(station = %station, "station returned no rows; skipped");
            continue;
        }
        let path = write_station_csv(&config.raw_dir, &config.prefecture, station, stamp, &rows)?;
        info!(station = %station, rows = rows.len(), path = %path.display(), "station extract saved");
        written.push(path);
    }

    if failed.len() == config.stations.len() {
        return Err(AppError::Fetch(format!(
            "Every station request failed: {}.",
            failed.join(", ")
        )));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_extract;
    use serde_json::json;

    fn row(v: Value) -> ApiRow {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn month_codes_are_validated() {
        assert!(validate_ym("202401").is_ok());
        assert!(validate_ym("202412").is_ok());
        assert!(validate_ym("202413").is_err());
        assert!(validate_ym("2024-01").is_err());
        assert!(validate_ym("24011").is_err());
    }

    #[test]
    fn flatten_takes_key_union_in_first_seen_order() {
        let rows = vec![
            row(json!({"SKT_CD": "13101010", "SKT_DATE": "2024-01-01", "PM2_5": 12})),
            row(json!({"SKT_CD": "13101010", "SKT_DATE": "2024-01-01", "WD": "N", "PM2_5": null})),
        ];
        let (header, records) = flatten_rows(&rows);
        assert_eq!(header.len(), 4);
        assert_eq!(header.last().map(String::as_str), Some("WD"));
        let pm = header.iter().position(|h| h == "PM2_5").unwrap();
        assert_eq!(records[0][pm], "12");
        assert_eq!(records[1][pm], "");
        assert_eq!(records[0][3], "");
    }

    #[test]
    fn written_extract_reads_back_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            row(json!({"SKT_CD": "13101010", "SKT_DATE": "2024/01/01", "SKT_TIME": "1", "PM2_5": "12", "WD": "NE"})),
            row(json!({"SKT_CD": "13101010", "SKT_DATE": "2024/01/01", "SKT_TIME": "24", "PM2_5": 9.5, "WD": "N"})),
        ];
        let path = write_station_csv(dir.path(), "13", "13101010", "20240101_000000", &rows).unwrap();
        assert!(path.ends_with("13_13101010_20240101_000000.csv"));

        let parsed = read_extract(&path).unwrap();
        assert!(parsed.row_errors.is_empty());
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].hour, 24);
        let pm = MEASUREMENT_COLUMNS.iter().position(|c| *c == "PM2_5").unwrap();
        assert_eq!(parsed.records[1].values[pm].as_deref(), Some("9.5"));
    }

    /// Serve one canned HTTP response per connection, in order.
    fn serve(responses: Vec<(u16, &'static str)>) -> String {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                    line.clear();
                }
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
        });
        format!("http://{addr}/soramame/api/data_search")
    }

    fn local_client(base_url: String) -> SoramameClient {
        SoramameClient {
            client: Client::builder().no_proxy().build().unwrap(),
            base_url,
        }
    }

    fn fetch_config(raw_dir: &Path, stations: &[&str]) -> FetchConfig {
        FetchConfig {
            raw_dir: raw_dir.to_path_buf(),
            prefecture: "13".to_string(),
            stations: stations.iter().map(|s| s.to_string()).collect(),
            start_ym: "202401".to_string(),
            end_ym: "202401".to_string(),
        }
    }

    #[test]
    fn failed_station_is_skipped_and_the_rest_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve(vec![
            (500, "[]"),
            (200, r#"[{"SKT_CD": "B", "SKT_DATE": "2024/01/01", "SKT_TIME": "1", "PM2_5": 10}]"#),
        ]);
        let client = local_client(url);
        let written = run_fetch(&fetch_config(dir.path(), &["A", "B"]), &client, "20240101_000000").unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("13_B_20240101_000000.csv"));
    }

    #[test]
    fn all_stations_failing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve(vec![(500, "[]"), (503, "[]")]);
        let client = local_client(url);
        let err = run_fetch(&fetch_config(dir.path(), &["A", "B"]), &client, "20240101_000000").unwrap_err();
        assert!(matches!(err, AppError::Fetch(ref msg) if msg.contains("A, B")), "unexpected error: {err}");
    }
}
