//! Time-indexed correction tables and point-in-time interpolation
//!
//! A correction table has one row per validity start and one column per
//! version label. Cells are JSON values; `null` means "no value".

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// How a table is resolved to the row active at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// A value holds from its validity start until superseded
    StepFill,
    /// Exact match on the query time, otherwise numeric values are aligned
    /// by linear interpolation in time (held after the last row)
    Interpolate,
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub time: DateTime<Utc>,
    pub cells: HashMap<String, Value>,
}

/// Snapshot of one correction as read from the store
#[derive(Debug, Clone)]
pub struct CorrectionTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl CorrectionTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a table from cells in store order
    ///
    /// Consecutive cells with the same timestamp form one row unless the
    /// version repeats, in which case a new row starts. Rows are then sorted
    /// by time, keeping store order among equal timestamps.
    pub fn from_cells<I>(name: impl Into<String>, cells: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, String, Value)>,
    {
        let mut table = Self::new(name);
        for (time, version, value) in cells {
            table.push_cell(time, version, value);
        }
        table.rows.sort_by_key(|row| row.time);
        table
    }

    fn push_cell(&mut self, time: DateTime<Utc>, version: String, value: Value) {
        if !self.columns.contains(&version) {
            self.columns.push(version.clone());
        }

        match self.rows.last_mut() {
            Some(row) if row.time == time && !row.cells.contains_key(&version) => {
                row.cells.insert(version, value);
            }
            _ => {
                let mut cells = HashMap::new();
                cells.insert(version, value);
                self.rows.push(TableRow { time, cells });
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version labels in the order they were first written
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn has_column(&self, version: &str) -> bool {
        self.columns.iter().any(|c| c == version)
    }

    /// Cell of the earliest row, as used for the global version table
    pub fn first_row_value(&self, version: &str) -> Option<&Value> {
        self.rows.first().and_then(|row| row.cells.get(version))
    }
}

/// A table resolved at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    correction: String,
    columns: Vec<String>,
    values: HashMap<String, Value>,
}

impl Snapshot {
    /// Value of one version column; `Value::Null` when the column has no value at this time
    pub fn value(&self, version: &str) -> Result<&Value> {
        if !self.columns.iter().any(|c| c == version) {
            return Err(Error::VersionNotFound {
                correction: self.correction.clone(),
                version: version.to_string(),
                available: self.columns.clone(),
            });
        }
        Ok(self.values.get(version).unwrap_or(&Value::Null))
    }
}

/// Resolve a table to the row active at `at`
pub fn interpolate(table: &CorrectionTable, at: DateTime<Utc>, mode: FillMode) -> Snapshot {
    let values = table
        .columns
        .iter()
        .map(|column| {
            let value = match mode {
                FillMode::StepFill => step_fill(&table.rows, column, at),
                FillMode::Interpolate => align(&table.rows, column, at),
            };
            (column.clone(), value)
        })
        .collect();

    Snapshot {
        correction: table.name.clone(),
        columns: table.columns.clone(),
        values,
    }
}

fn step_fill(rows: &[TableRow], column: &str, at: DateTime<Utc>) -> Value {
    rows.iter()
        .take_while(|row| row.time <= at)
        .filter_map(|row| row.cells.get(column))
        .filter(|value| !value.is_null())
        .last()
        .cloned()
        .unwrap_or(Value::Null)
}

fn align(rows: &[TableRow], column: &str, at: DateTime<Utc>) -> Value {
    // Among rows sharing a timestamp the later stored one wins, as in step-fill
    let exact = rows
        .iter()
        .filter(|row| row.time == at)
        .filter_map(|row| row.cells.get(column))
        .filter(|value| !value.is_null())
        .last();
    if let Some(value) = exact {
        return value.clone();
    }

    let numeric = |row: &TableRow| {
        row.cells
            .get(column)
            .and_then(Value::as_f64)
            .map(|v| (row.time, v))
    };
    let before = rows.iter().filter(|row| row.time < at).filter_map(numeric).last();
    let after = rows
        .iter()
        .filter(|row| row.time > at)
        .filter_map(numeric)
        .fold(None, |next, (time, value)| match next {
            Some((first, _)) if first != time => next,
            _ => Some((time, value)),
        });

    match (before, after) {
        (Some((t0, v0)), Some((t1, v1))) => {
            let fraction = span_nanos(at - t0) / span_nanos(t1 - t0);
            Value::from(v0 + (v1 - v0) * fraction)
        }
        (Some((_, v0)), None) => Value::from(v0),
        _ => Value::Null,
    }
}

fn span_nanos(span: Duration) -> f64 {
    span.num_nanoseconds()
        .map(|n| n as f64)
        .unwrap_or_else(|| span.num_milliseconds() as f64 * 1e6)
}
