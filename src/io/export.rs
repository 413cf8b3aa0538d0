//! Forecast persistence.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: `ds,yhat,yhat_lower,yhat_upper`, one row per future hour.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{DATETIME_FMT, ForecastPoint};
use crate::error::AppError;

/// Write forecast rows to `<dir>/prediction_<stamp>.csv`.
pub fn write_prediction_csv(dir: &Path, points: &[ForecastPoint], stamp: &str) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;
    let path = dir.join(format!("prediction_{stamp}.csv"));

    let mut file = File::create(&path).map_err(|e| AppError::io(&path, e))?;

    writeln!(file, "ds,yhat,yhat_lower,yhat_upper").map_err(|e| AppError::io(&path, e))?;
    for p in points {
        writeln!(
            file,
            "{},{:.6},{:.6},{:.6}",
            p.ds.format(DATETIME_FMT),
            p.yhat,
            p.yhat_lower,
            p.yhat_upper,
        )
        .map_err(|e| AppError::io(&path, e))?;
    }

    Ok(path)
}
