use crate::config::DateWindow;
use crate::error::{ReportError, ReportResult};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

/// One row: column name to value, in column order.
///
/// Rows read from a file remember the line they started on so later stages
/// can point at it when a value fails to parse. Rows built for output use
/// line 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    line: u64,
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(line: u64) -> Self {
        Self {
            line,
            fields: Vec::new(),
        }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Like `get`, but a missing column is an error tied to this row's line.
    pub fn require(&self, column: &str) -> ReportResult<&str> {
        self.get(column)
            .ok_or_else(|| ReportError::parse(self.line, format!("row has no {:?} value", column)))
    }

    /// Set a column, replacing the value in place if it already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    pub entity: String,
    pub entity_id: String,
    pub color: String,
    pub total: Decimal,
    pub rank: usize,
}

/// One (entity, color) cell of the market share matrix.
///
/// Every numeric field is `None` when there was nothing to report; zero is a
/// real total and is kept as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    pub entity: String,
    pub entity_id: String,
    pub category: String,
    pub color: String,
    pub prior_total: Option<Decimal>,
    pub current_total: Option<Decimal>,
    pub ratio: Option<Decimal>,
    pub share: Option<Decimal>,
    pub rank: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct WrittenReport {
    pub report: String,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub input: PathBuf,
    pub window: DateWindow,
    pub prior_window: DateWindow,
    pub reports: Vec<WrittenReport>,
    pub total_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_column_order_and_overwrites() {
        let mut r = Record::new(3).with("B", "1").with("A", "2");
        r.insert("B", "9");
        let columns: Vec<_> = r.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(columns, vec![("B", "9"), ("A", "2")]);
        assert_eq!(r.get("B"), Some("9"));
    }

    #[test]
    fn require_reports_the_row_line() {
        let r = Record::new(42).with("Elf Name", "Alwen");
        assert_eq!(r.require("Elf Name").unwrap(), "Alwen");
        match r.require("Gold") {
            Err(ReportError::Parse { line, message }) => {
                assert_eq!(line, 42);
                assert!(message.contains("Gold"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
