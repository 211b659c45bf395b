// Fixed column names, defaults, and the per-run configuration.
//
// The input layout is dictated by the Elven Report Bureau export and the
// PayPal transaction export, so column names are constants rather than
// options. Everything that changes between runs lives in `ReportConfig`.
use crate::error::{ReportError, ReportResult};
use crate::reports::ReportKind;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::path::PathBuf;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive start of the reporting window when none is given.
pub const DEFAULT_START: &str = "2015-01-01";
/// Exclusive end of the reporting window when none is given.
pub const DEFAULT_END: &str = "2015-07-01";
pub const DEFAULT_GEM_LOOKUP: &str = "colo.csv";

pub const MINING_DATE: &str = "Mining Date";
pub const ELF_NAME: &str = "Elf Name";
pub const ELF_ID: &str = "Elf ID";
pub const GEM_TYPE: &str = "Gem Type";
pub const GEM_COLOR: &str = "Gem Color";
pub const COLOR: &str = "Color";
pub const COLOR_CAT: &str = "Color Cat";
pub const WEIGHT: &str = "Weight";
pub const QUANTITY: &str = "Quantity";
pub const TOTAL_WEIGHT: &str = "Total Weight";
pub const GOLD: &str = "Gold";
pub const RANK: &str = "Rank";
pub const RANK_IN_COLOR: &str = "Rank in Gem Color";

/// Half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ReportResult<Self> {
        if start >= end {
            return Err(ReportError::Config(format!(
                "start date {} must be before end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// The full calendar year before the one this window starts in.
    ///
    /// A window starting anywhere in 2015 compares against
    /// `[2014-01-01, 2015-01-01)`.
    pub fn preceding_year(&self) -> ReportResult<Self> {
        let year = self.start.year();
        let start = NaiveDate::from_ymd_opt(year - 1, 1, 1);
        let end = NaiveDate::from_ymd_opt(year, 1, 1);
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(ReportError::Config(format!(
                "no calendar year precedes {}",
                self.start
            ))),
        }
    }

    /// Year used in column labels such as `Total Weight 2015`.
    pub fn label(&self) -> i32 {
        self.start.year()
    }
}

/// Everything one invocation needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub input: PathBuf,
    pub window: DateWindow,
    pub prior: DateWindow,
    pub reports: Vec<ReportKind>,
    pub gem_lookup: PathBuf,
    pub preview_rows: usize,
    pub write_summary: bool,
}

impl ReportConfig {
    /// Pick the comparison window: both overrides, or the preceding year.
    pub fn resolve_prior(
        window: &DateWindow,
        prior_start: Option<NaiveDate>,
        prior_end: Option<NaiveDate>,
    ) -> ReportResult<DateWindow> {
        match (prior_start, prior_end) {
            (Some(start), Some(end)) => DateWindow::new(start, end),
            (None, None) => window.preceding_year(),
            _ => Err(ReportError::Config(
                "--prior-start and --prior-end must be given together".to_string(),
            )),
        }
    }
}

/// Drop repeated report kinds, keeping first-mention order.
pub fn dedup_reports(kinds: &[ReportKind]) -> Vec<ReportKind> {
    let mut out: Vec<ReportKind> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !out.contains(kind) {
            out.push(*kind);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn window_is_inclusive_start_exclusive_end() {
        let w = DateWindow::new(d("2015-01-01"), d("2015-07-01")).unwrap();
        assert!(w.contains(d("2015-01-01")));
        assert!(w.contains(d("2015-06-30")));
        assert!(!w.contains(d("2015-07-01")));
        assert!(!w.contains(d("2014-12-31")));
    }

    #[test]
    fn empty_or_inverted_window_is_rejected() {
        assert!(matches!(
            DateWindow::new(d("2015-07-01"), d("2015-01-01")),
            Err(ReportError::Config(_))
        ));
        assert!(DateWindow::new(d("2015-01-01"), d("2015-01-01")).is_err());
    }

    #[test]
    fn preceding_year_is_previous_calendar_year() {
        let w = DateWindow::new(d("2015-03-15"), d("2015-07-01")).unwrap();
        let prior = w.preceding_year().unwrap();
        assert_eq!(prior.start, d("2014-01-01"));
        assert_eq!(prior.end, d("2015-01-01"));
        assert_eq!(prior.label(), 2014);
        assert_eq!(w.label(), 2015);
    }

    #[test]
    fn prior_override_needs_both_bounds() {
        let w = DateWindow::new(d("2015-01-01"), d("2015-07-01")).unwrap();
        let custom =
            ReportConfig::resolve_prior(&w, Some(d("2014-01-01")), Some(d("2014-07-01"))).unwrap();
        assert_eq!(custom.end, d("2014-07-01"));
        assert!(ReportConfig::resolve_prior(&w, Some(d("2014-01-01")), None).is_err());
    }

    #[test]
    fn dedup_keeps_first_mention_order() {
        let kinds = [
            ReportKind::MarketShare,
            ReportKind::TotalGoldRank,
            ReportKind::MarketShare,
        ];
        assert_eq!(
            dedup_reports(&kinds),
            vec![ReportKind::MarketShare, ReportKind::TotalGoldRank]
        );
    }
}
