//! Evaluation JSON export.
//!
//! The file wraps the evaluation outcome with enough run metadata to be read
//! on its own: which target was backtested and when the run happened.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::AppError;
use crate::evaluate::Evaluation;

#[derive(Debug, Serialize)]
struct EvaluationFile<'a> {
    tool: &'static str,
    generated_at: NaiveDateTime,
    target: &'a str,
    evaluation: &'a Evaluation,
}

/// Write an evaluation outcome (report or unavailable notice) as pretty JSON.
pub fn write_evaluation_json(
    path: &Path,
    target: &str,
    generated_at: NaiveDateTime,
    evaluation: &Evaluation,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    let doc = EvaluationFile {
        tool: "aq",
        generated_at,
        target,
        evaluation,
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &doc)?;
    writer.flush().map_err(|e| AppError::io(path, e))?;
    Ok(())
}
