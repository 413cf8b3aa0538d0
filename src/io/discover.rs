//! Raw extract discovery.
//!
//! The raw directory is scanned (non-recursively) for `*.csv` files. The result
//! is sorted by path so that "read order" is deterministic across platforms and
//! runs; the `read-order` tie-break depends on it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;

/// List `*.csv` files directly inside `dir`, sorted by path.
///
/// A missing directory counts as empty.
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AppError::io(dir, e)),
    };

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
        if is_file && has_csv_extension(&path) {
            out.push(path);
        }
    }
    out.sort();
    debug!(dir = %dir.display(), files = out.len(), "discovered raw extracts");
    Ok(out)
}

/// Like [`find_csv_files`], but an empty result is an `EmptyInput` error.
pub fn require_csv_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let files = find_csv_files(dir)?;
    if files.is_empty() {
        return Err(AppError::EmptyInput {
            dir: dir.to_path_buf(),
        });
    }
    Ok(files)
}

pub fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        == Some(true)
}
