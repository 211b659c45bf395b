//! Error type shared by every report stage.
//!
//! Structural problems (missing columns, malformed rows, unwritable files)
//! are errors and abort the run. Per-row data quality issues (empty fields,
//! out-of-window dates, unknown gem types) are not represented here; they are
//! logged and the row is skipped.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Bad command line or configuration.
    #[error("{0}")]
    Config(String),

    /// A required column is absent from the source header.
    #[error("There is no {column:?} column in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    /// Malformed row, date or number.
    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Input file could not be opened or its header read.
    #[error("Failed to read {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Destination could not be created or written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub fn parse(line: u64, message: impl Into<String>) -> Self {
        ReportError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Wrap a csv reader error, keeping the line it was raised on.
    pub fn from_csv(err: csv::Error, fallback_line: u64) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(fallback_line);
        ReportError::Parse {
            line,
            message: err.to_string(),
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_message_names_the_column() {
        let err = ReportError::MissingColumn {
            column: "Gem Type".into(),
            path: PathBuf::from("mining.csv"),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"Gem Type\""));
        assert!(msg.contains("mining.csv"));
    }

    #[test]
    fn parse_error_reports_line_number() {
        let err = ReportError::parse(17, "bad date \"2015-13-01\"");
        assert_eq!(err.to_string(), "line 17: bad date \"2015-13-01\"");
    }
}
