//! Versioned observation store.
//!
//! A store is an immutable snapshot of the consolidated series plus a version
//! number. Handlers are plain functions: they take a store, leave it untouched,
//! and return a new store whose version is one higher. Unchanged snapshots are
//! shared through `Arc`, so holding on to an old version is cheap.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::{DateWindow, ObservationTable};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct ObservationStore {
    version: u64,
    table: Arc<ObservationTable>,
}

/// A single edit applied by [`apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    RetainWindow(DateWindow),
    SetValue {
        timestamp: NaiveDateTime,
        column: String,
        value: String,
    },
    ClearValue {
        timestamp: NaiveDateTime,
        column: String,
    },
    DropRows(Vec<NaiveDateTime>),
}

impl ObservationStore {
    pub fn new(table: ObservationTable) -> Self {
        Self {
            version: 0,
            table: Arc::new(table),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn snapshot(&self) -> &ObservationTable {
        &self.table
    }

    pub fn shared(&self) -> Arc<ObservationTable> {
        Arc::clone(&self.table)
    }

    fn next(&self, table: ObservationTable) -> Self {
        Self {
            version: self.version + 1,
            table: Arc::new(table),
        }
    }
}

/// Apply one edit and return the next version.
pub fn apply(store: &ObservationStore, edit: &Edit) -> Result<ObservationStore, AppError> {
    match edit {
        Edit::RetainWindow(window) => Ok(retain_window(store, *window)),
        Edit::SetValue {
            timestamp,
            column,
            value,
        } => set_value(store, *timestamp, column, Some(value.clone())),
        Edit::ClearValue { timestamp, column } => clear_value(store, *timestamp, column),
        Edit::DropRows(timestamps) => Ok(drop_rows(store, timestamps)),
    }
}

/// Keep only rows whose calendar date falls inside `window`.
pub fn retain_window(store: &ObservationStore, window: DateWindow) -> ObservationStore {
    let mut table = ObservationTable::new(store.table.columns.clone());
    table.rows = store
        .table
        .rows
        .iter()
        .filter(|r| window.contains(r.timestamp))
        .cloned()
        .collect();
    store.next(table)
}

/// Replace (or clear, with `None`) one cell.
pub fn set_value(
    store: &ObservationStore,
    timestamp: NaiveDateTime,
    column: &str,
    value: Option<String>,
) -> Result<ObservationStore, AppError> {
    let col = store
        .table
        .column_index(column)
        .ok_or_else(|| AppError::Data(format!("Unknown column `{column}`.")))?;
    let row = store
        .table
        .rows
        .binary_search_by(|r| r.timestamp.cmp(&timestamp))
        .map_err(|_| AppError::Data(format!("No observation at {timestamp}.")))?;

    let mut table = ObservationTable::clone(&store.table);
    let cells = &mut table.rows[row].values;
    if cells.len() <= col {
        cells.resize(col + 1, None);
    }
    cells[col] = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    Ok(store.next(table))
}

/// Mark one cell as missing.
pub fn clear_value(
    store: &ObservationStore,
    timestamp: NaiveDateTime,
    column: &str,
) -> Result<ObservationStore, AppError> {
    set_value(store, timestamp, column, None)
}

/// Remove the rows at the given timestamps. Unknown timestamps are ignored.
pub fn drop_rows(store: &ObservationStore, timestamps: &[NaiveDateTime]) -> ObservationStore {
    let mut table = ObservationTable::new(store.table.columns.clone());
    table.rows = store
        .table
        .rows
        .iter()
        .filter(|r| !timestamps.contains(&r.timestamp))
        .cloned()
        .collect();
    store.next(table)
}
