use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::{
    consts::consts::{MILLIS_PER_DAY, SERIAL_UNIX_EPOCH_OFFSET},
    diagnostics::{Diagnostic, DiagnosticSink},
    model::employee::NewEmployee,
};

use super::row::{CellValue, Row};

pub const NAME_COLUMNS: [&str; 2] = ["name", "employee"];
pub const BIRTHDAY_COLUMNS: [&str; 2] = ["birthday", "dob"];

/// Why a single row was left out of an import
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("missing name")]
    MissingName,

    #[error("name is not text")]
    NameNotText,

    #[error("missing birthday")]
    MissingBirthday,

    #[error("birthday is not a YYYY-MM-DD date: {0}")]
    InvalidDate(String),

    #[error("birthday serial is out of range: {0}")]
    InvalidSerial(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("No valid records found ({dropped} rows dropped)")]
    NoValidRecords { dropped: usize },

    #[error("Import source is not a list of rows: {0}")]
    InvalidSource(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Adds the imported employees next to the current roster
    #[default]
    Append,
    /// Overwrites the roster with the imported employees
    Replace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    /// Zero based position in the input
    pub row: usize,
    pub reason: RowError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// Accepted employees in input order
    pub records: Vec<NewEmployee>,
    pub dropped: Vec<DroppedRow>,
}

impl ImportReport {
    pub fn accepted_count(&self) -> usize {
        self.records.len()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Normalizes spreadsheet rows into employees. Invalid rows are dropped and
/// reported to `sink`; an import without a single valid row is an error.
#[tracing::instrument(skip(rows, sink), fields(rows = rows.len()))]
pub fn import_rows(rows: &[Row], sink: &dyn DiagnosticSink) -> Result<ImportReport, ImportError> {
    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = vec![];

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(row) {
            Ok(employee) => records.push(employee),
            Err(reason) => {
                sink.emit(Diagnostic::RowDropped {
                    row: index,
                    reason: reason.to_string(),
                });

                dropped.push(DroppedRow { row: index, reason });
            }
        }
    }

    sink.emit(Diagnostic::ImportSummary {
        accepted: records.len(),
        dropped: dropped.len(),
    });

    if records.is_empty() {
        return Err(ImportError::NoValidRecords {
            dropped: dropped.len(),
        });
    }

    Ok(ImportReport { records, dropped })
}

pub fn normalize_row(row: &Row) -> Result<NewEmployee, RowError> {
    let name = match row.resolve(&NAME_COLUMNS) {
        Some(CellValue::Text(name)) => name.trim().to_string(),
        Some(CellValue::Number(_)) => return Err(RowError::NameNotText),
        Some(CellValue::Empty) | None => return Err(RowError::MissingName),
    };

    let birthday = match row.resolve(&BIRTHDAY_COLUMNS) {
        Some(cell) => parse_birthday(cell)?,
        None => return Err(RowError::MissingBirthday),
    };

    Ok(NewEmployee { name, birthday })
}

pub fn parse_birthday(cell: &CellValue) -> Result<NaiveDate, RowError> {
    match cell {
        CellValue::Number(serial) => {
            serial_to_date(*serial).ok_or(RowError::InvalidSerial(*serial))
        }
        CellValue::Text(text) => parse_iso_date(text),
        CellValue::Empty => Err(RowError::MissingBirthday),
    }
}

/// Strict `YYYY-MM-DD`: four digit year, zero padded month and day
pub fn parse_iso_date(text: &str) -> Result<NaiveDate, RowError> {
    let trimmed = text.trim();
    let invalid = || RowError::InvalidDate(trimmed.to_string());

    if !is_iso_date_shape(trimmed) {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())
}

// chrono accepts unpadded, signed and short years for %Y-%m-%d
fn is_iso_date_shape(text: &str) -> bool {
    let bytes = text.as_bytes();

    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

/// Converts a spreadsheet serial (day 0 = 1899-12-30) to the UTC calendar date.
/// Time of day fractions are rounded to the millisecond and then dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }

    let millis = ((serial - SERIAL_UNIX_EPOCH_OFFSET) * MILLIS_PER_DAY).round();

    if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }

    DateTime::<Utc>::from_timestamp_millis(millis as i64).map(|timestamp| timestamp.date_naive())
}

/// Reads rows from a JSON array of objects, the shape sheet-to-JSON exporters produce
pub fn rows_from_json(value: &Value) -> Result<Vec<Row>, ImportError> {
    match value {
        Value::Array(entries) => Ok(entries.iter().map(Row::from_json).collect()),
        other => Err(ImportError::InvalidSource(json_kind(other).to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
