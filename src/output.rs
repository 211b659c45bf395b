use crate::error::{ReportError, ReportResult};
use crate::types::Record;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

/// Write `rows` under a header of `columns`, in order.
///
/// A row missing one of the columns gets an empty cell. Returns the number of
/// data rows written.
pub fn write_rows(path: &Path, columns: &[String], rows: &[Record]) -> ReportResult<usize> {
    let write_err = |source: csv::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(write_err)?;
    wtr.write_record(columns).map_err(write_err)?;
    for row in rows {
        wtr.write_record(columns.iter().map(|c| row.get(c).unwrap_or_default()))
            .map_err(write_err)?;
    }
    wtr.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(rows.len())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ReportResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Render the first `max_rows` rows as a markdown table.
pub fn render_preview(columns: &[String], rows: &[Record], max_rows: usize) -> Option<String> {
    if rows.is_empty() || max_rows == 0 {
        return None;
    }
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(String::as_str));
    for row in rows.iter().take(max_rows) {
        builder.push_record(columns.iter().map(|c| row.get(c).unwrap_or_default()));
    }
    Some(builder.build().with(Style::markdown()).to_string())
}

pub fn preview_rows(title: &str, columns: &[String], rows: &[Record], max_rows: usize) {
    println!("\n{}\n", title);
    match render_preview(columns, rows, max_rows) {
        Some(table) => println!("{}\n", table),
        None => println!("(no rows)\n"),
    }
}
