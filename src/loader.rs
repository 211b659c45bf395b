use crate::config::{DateWindow, MINING_DATE};
use crate::error::{ReportError, ReportResult};
use crate::types::Record;
use crate::util::parse_date;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What to pull out of a source file.
///
/// `columns` must all exist in the header and are the only columns kept.
/// `non_empty` rows with an empty value in any of these columns are skipped.
/// With a `window`, the date column must exist and be filled, and only rows
/// dated inside the window are kept.
#[derive(Debug, Clone)]
pub struct ExtractSpec<'a> {
    pub columns: &'a [&'a str],
    pub non_empty: &'a [&'a str],
    pub window: Option<DateWindow>,
    pub date_column: &'a str,
}

impl<'a> ExtractSpec<'a> {
    /// Keep every row; only check that the columns exist.
    pub fn all(columns: &'a [&'a str]) -> Self {
        Self {
            columns,
            non_empty: &[],
            window: None,
            date_column: MINING_DATE,
        }
    }

    /// Mining extracts: every projected column must be filled and the
    /// mining date must fall in `window`.
    pub fn mining(columns: &'a [&'a str], window: DateWindow) -> Self {
        Self {
            columns,
            non_empty: columns,
            window: Some(window),
            date_column: MINING_DATE,
        }
    }
}

/// Lazy, order-preserving reader over one CSV file.
///
/// The header is validated when the source is opened, so a missing column
/// fails before any row is read.
pub struct RowSource {
    path: PathBuf,
    records: StringRecordsIntoIter<File>,
    columns: Vec<(String, usize)>,
    non_empty: Vec<(String, usize)>,
    date: Option<(DateWindow, usize)>,
    last_line: u64,
    kept: usize,
    skipped_null: usize,
    skipped_window: usize,
    finished: bool,
}

impl RowSource {
    pub fn open(path: &Path, spec: &ExtractSpec<'_>) -> ReportResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|source| ReportError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let headers = rdr
            .headers()
            .map_err(|source| ReportError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .clone();

        let locate = |column: &str| -> ReportResult<(String, usize)> {
            headers
                .iter()
                .position(|h| h == column)
                .map(|idx| (column.to_string(), idx))
                .ok_or_else(|| ReportError::MissingColumn {
                    column: column.to_string(),
                    path: path.to_path_buf(),
                })
        };

        let columns = spec
            .columns
            .iter()
            .map(|c| locate(*c))
            .collect::<ReportResult<Vec<_>>>()?;
        let mut non_empty = spec
            .non_empty
            .iter()
            .map(|c| locate(*c))
            .collect::<ReportResult<Vec<_>>>()?;
        let date = match spec.window {
            Some(window) => {
                let located = locate(spec.date_column)?;
                let idx = located.1;
                if !non_empty.iter().any(|(name, _)| name == &located.0) {
                    non_empty.push(located);
                }
                Some((window, idx))
            }
            None => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            records: rdr.into_records(),
            columns,
            non_empty,
            date,
            last_line: 1,
            kept: 0,
            skipped_null: 0,
            skipped_window: 0,
            finished: false,
        })
    }

    /// Decide whether a raw row belongs in the extract.
    fn keep(&mut self, raw: &StringRecord, line: u64) -> ReportResult<bool> {
        for (name, idx) in &self.non_empty {
            if raw.get(*idx).map_or(true, str::is_empty) {
                debug!("Skipping row {} with null {:?}", line, name);
                self.skipped_null += 1;
                return Ok(false);
            }
        }
        if let Some((window, idx)) = &self.date {
            let value = raw.get(*idx).unwrap_or_default();
            let date = parse_date(value, line)?;
            if !window.contains(date) {
                self.skipped_window += 1;
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn project(&self, raw: &StringRecord, line: u64) -> Record {
        let mut record = Record::new(line);
        for (name, idx) in &self.columns {
            record.insert(name.as_str(), raw.get(*idx).unwrap_or_default());
        }
        record
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            info!(
                "{}: kept {} rows, skipped {} with empty fields, {} outside the date window",
                self.path.display(),
                self.kept,
                self.skipped_null,
                self.skipped_window
            );
        }
    }
}

impl Iterator for RowSource {
    type Item = ReportResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let raw = match self.records.next() {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(ReportError::from_csv(e, self.last_line + 1)));
                }
                None => {
                    self.finish();
                    return None;
                }
            };
            let line = raw
                .position()
                .map(|p| p.line())
                .unwrap_or(self.last_line + 1);
            self.last_line = line;
            match self.keep(&raw, line) {
                Ok(true) => {
                    self.kept += 1;
                    return Some(Ok(self.project(&raw, line)));
                }
                Ok(false) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Read a whole extract into memory.
pub fn read_rows(path: &Path, spec: &ExtractSpec<'_>) -> ReportResult<Vec<Record>> {
    RowSource::open(path, spec)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::new(
            NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        )
        .unwrap()
    }

    const MINING: &str = "\
Elf Name,Mining Date,Gold,Notes
Alwen,2015-01-01,10,first
Brin,2014-12-31,20,too early
Cael,2015-03-02,,no gold
Dorn,2015-07-01,40,end is exclusive
Eryn,2015-06-30,50,last day
";

    #[test]
    fn filters_nulls_and_window_and_projects_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "mining.csv", MINING);
        let cols = ["Elf Name", "Gold"];
        let spec = ExtractSpec::mining(&cols, window("2015-01-01", "2015-07-01"));
        let rows = read_rows(&path, &spec).unwrap();

        let names: Vec<_> = rows.iter().map(|r| r.get("Elf Name").unwrap()).collect();
        assert_eq!(names, vec!["Alwen", "Eryn"]);
        assert_eq!(rows[0].get("Gold"), Some("10"));
        assert_eq!(rows[0].get("Mining Date"), None);
        assert_eq!(rows[0].get("Notes"), None);
        assert_eq!(rows[0].line(), 2);
        assert_eq!(rows[1].line(), 6);
    }

    #[test]
    fn missing_column_fails_at_open_even_without_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.csv", "Elf Name,Mining Date\n");
        let cols = ["Elf Name", "Gold"];
        let spec = ExtractSpec::mining(&cols, window("2015-01-01", "2015-07-01"));
        match RowSource::open(&path, &spec) {
            Err(ReportError::MissingColumn { column, .. }) => assert_eq!(column, "Gold"),
            Err(other) => panic!("unexpected {:?}", other),
            Ok(_) => panic!("expected a missing column error"),
        }
    }

    #[test]
    fn date_column_is_required_only_with_a_window() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "lookup.csv", "Gem Type,Color\nRuby,Red\nOdd,\n");
        let cols = ["Gem Type", "Color"];
        let rows = read_rows(&path, &ExtractSpec::all(&cols)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("Color"), Some(""));

        let spec = ExtractSpec::mining(&cols, window("2015-01-01", "2015-07-01"));
        assert!(matches!(
            RowSource::open(&path, &spec),
            Err(ReportError::MissingColumn { ref column, .. }) if column == "Mining Date"
        ));
    }

    #[test]
    fn unparsable_date_aborts_with_line() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bad.csv",
            "Elf Name,Mining Date,Gold\nAlwen,2015-01-02,1\nBrin,someday,2\nCael,2015-01-03,3\n",
        );
        let cols = ["Elf Name", "Gold"];
        let spec = ExtractSpec::mining(&cols, window("2015-01-01", "2015-07-01"));
        let mut source = RowSource::open(&path, &spec).unwrap();
        assert!(source.next().unwrap().is_ok());
        match source.next() {
            Some(Err(ReportError::Parse { line, .. })) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
        assert!(source.next().is_none());
    }

    #[test]
    fn short_rows_count_as_null() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "short.csv",
            "Elf Name,Mining Date,Gold\nAlwen,2015-01-02\nBrin,2015-01-03,7\n",
        );
        let cols = ["Elf Name", "Gold"];
        let spec = ExtractSpec::mining(&cols, window("2015-01-01", "2015-07-01"));
        let rows = read_rows(&path, &spec).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Gold"), Some("7"));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.csv");
        let mut body = b"Elf Name,Mining Date,Gold\n".to_vec();
        body.extend_from_slice(b"Al\xffwen,2015-01-02,1\n");
        fs::write(&path, body).unwrap();
        let cols = ["Elf Name", "Gold"];
        let spec = ExtractSpec::mining(&cols, window("2015-01-01", "2015-07-01"));
        let err = read_rows(&path, &spec).unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 2, .. }));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = TempDir::new().unwrap();
        let cols = ["Elf Name"];
        let err = RowSource::open(&dir.path().join("nope.csv"), &ExtractSpec::all(&cols))
            .err()
            .unwrap();
        assert!(matches!(err, ReportError::Open { .. }));
    }
}
