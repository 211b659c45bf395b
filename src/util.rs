// Parsing and formatting helpers.
//
// Everything that turns raw CSV text into typed values (dates, decimals)
// lives here, along with the console formatting and output naming rules.
use crate::config::DATE_FORMAT;
use crate::error::{ReportError, ReportResult};
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Parse a `YYYY-MM-DD` cell. Failure is fatal and carries the row's line.
pub fn parse_date(s: &str, line: u64) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| ReportError::parse(line, format!("bad date {:?}: {}", s, e)))
}

/// `clap` value parser for the date options.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD, got {:?} ({})", s, e))
}

/// Parse an exact decimal amount.
///
/// Thousands separators (`1,234.50`) are accepted since payment and mining
/// exports both produce them; anything else that is not a plain number is a
/// parse error.
pub fn parse_decimal(s: &str, column: &str, line: u64) -> ReportResult<Decimal> {
    let cleaned = s.trim().replace(',', "");
    Decimal::from_str(&cleaned).map_err(|e| {
        ReportError::parse(line, format!("bad {} value {:?}: {}", column, s, e))
    })
}

/// Render an optional number for a CSV cell; `None` becomes an empty cell.
pub fn format_optional<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Sibling of `input` named `<stem><suffix>.<extension>`.
///
/// `reports/mining.csv` with `-ms` gives `reports/mining-ms.csv`.
pub fn sibling_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    sibling_path(input, suffix, "csv")
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts printed to the console, e.g. `wrote 9,855 lines`.
    n.to_formatted_string(&Locale::en)
}
