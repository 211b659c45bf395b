// Entry point and high-level CLI flow.
//
// One run reads a single input CSV and writes one file per requested report
// next to it:
// - `-tgr`   total gold per elf with its overall rank,
// - `-ms`    the elf x gem color market share matrix,
// - `-allco` total weight per gem color,
// - `-rank`  each elf's total weight and rank within every gem color,
// - `-npsp`  a PayPal export reshaped for the NPSP donor import.
// Every report is built before anything is written, so a structural problem
// in the input leaves no partial output behind.
mod aggregate;
mod config;
mod donor;
mod error;
mod loader;
mod lookup;
mod output;
mod rank;
mod reports;
mod types;
mod util;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use config::{
    dedup_reports, DateWindow, ReportConfig, DEFAULT_END, DEFAULT_GEM_LOOKUP, DEFAULT_START,
};
use error::{ReportError, ReportResult};
use reports::{ReportKind, ReportOutput, ReportRunner};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use types::{SummaryStats, WrittenReport};

const NOTES: &str = "\
Report notes
============

Total Gold Rank (-tgr)
----------------------
Total gold per elf inside the reporting window, ranked from the largest
total down. Use it as a fixed rank when a dashboard is filtered down to a
single elf: ranking inside the filtered view would always show #1. A Top N
sheet does not need it, since its own rank is computed over every elf.
Elves with equal totals get consecutive ranks in name order.

Market Share (-ms)
------------------
One row per elf active in the reporting window and per gem color known to
the gem lookup file (colo.csv unless --gem-lookup says otherwise), whether
or not the elf mined that color. It carries the prior window's total, the
reporting window's total, their ratio, the elf's share of everything mined
in that color, and the elf's rank within the color. Cells with no data are
left blank. Colors without a color category are left out.

The prior window defaults to the calendar year before the start date.

All Color Totals (-allco)
-------------------------
Total weight per gem color across all elves in the reporting window; the
denominator of the market share column.

Rank in Gem Color (-rank)
-------------------------
One row per gem color and elf that mined it in the reporting window, with
the elf's total weight and its rank among the elves mining that color.
Ordered by color, then rank.

NPSP Donor Import (-npsp)
-------------------------
Reshapes a PayPal transaction export into the NPSP data import template.
Dates are not filtered.

Fixups after import:
 - number formats for the ratio and market share columns
 - sort the Top N sheet by Rank
";

#[derive(Parser, Debug)]
#[command(
    name = "gem-report",
    version,
    about = "Build ranked totals and market share reports from a mining report CSV"
)]
struct Cli {
    /// CSV file to read
    input: Option<PathBuf>,

    /// Inclusive start of the reporting window (YYYY-MM-DD)
    #[arg(short, long, default_value = DEFAULT_START, value_parser = util::parse_date_arg)]
    start_date: NaiveDate,

    /// Exclusive end of the reporting window (YYYY-MM-DD)
    #[arg(short, long, default_value = DEFAULT_END, value_parser = util::parse_date_arg)]
    end_date: NaiveDate,

    /// Inclusive start of the comparison window (default: the previous calendar year)
    #[arg(long, value_parser = util::parse_date_arg)]
    prior_start: Option<NaiveDate>,

    /// Exclusive end of the comparison window
    #[arg(long, value_parser = util::parse_date_arg)]
    prior_end: Option<NaiveDate>,

    /// Show report notes and exit
    #[arg(short, long)]
    notes: bool,

    /// Reports to build
    #[arg(
        short,
        long,
        value_enum,
        value_delimiter = ',',
        default_values = ["tgr", "ms"]
    )]
    reports: Vec<ReportKind>,

    /// Gem type to color reference file
    #[arg(long, env = "GEM_LOOKUP_PATH", default_value = DEFAULT_GEM_LOOKUP)]
    gem_lookup: PathBuf,

    /// Print the first N rows of each report
    #[arg(long, default_value_t = 0)]
    preview: usize,

    /// Also write <input>-summary.json
    #[arg(long)]
    summary: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "GEM_REPORT_LOG", default_value = "info")]
    log_level: String,
}

/// Initialise the global `tracing` subscriber, logging to stderr so the
/// report summary on stdout stays clean.
fn setup_logging(log_level: &str) {
    let normalised = match log_level.to_uppercase().as_str() {
        "WARNING" => "warn".to_string(),
        "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    };
    let filter = EnvFilter::try_new(normalised).unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry().with(filter).with(layer).init();
}

fn build_config(cli: &Cli, input: PathBuf) -> ReportResult<ReportConfig> {
    let window = DateWindow::new(cli.start_date, cli.end_date)?;
    let prior = ReportConfig::resolve_prior(&window, cli.prior_start, cli.prior_end)?;
    Ok(ReportConfig {
        input,
        window,
        prior,
        reports: dedup_reports(&cli.reports),
        gem_lookup: cli.gem_lookup.clone(),
        preview_rows: cli.preview,
        write_summary: cli.summary,
    })
}

fn run(config: &ReportConfig) -> ReportResult<()> {
    tracing::info!(
        "Reading {} for {} to {} (prior {} to {})",
        config.input.display(),
        config.window.start,
        config.window.end,
        config.prior.start,
        config.prior.end
    );

    let runner = ReportRunner::new(config);
    let outputs = config
        .reports
        .iter()
        .map(|kind| runner.generate(*kind))
        .collect::<ReportResult<Vec<ReportOutput>>>()?;

    let mut written = Vec::with_capacity(outputs.len());
    for out in &outputs {
        let path = util::output_path(&config.input, out.kind.suffix());
        let rows = output::write_rows(&path, &out.columns, &out.rows)?;
        println!("wrote {} lines to {:?}", util::format_int(rows), path);
        if config.preview_rows > 0 {
            output::preview_rows(out.kind.title(), &out.columns, &out.rows, config.preview_rows);
        }
        written.push(WrittenReport {
            report: out.kind.title().to_string(),
            path,
            rows,
        });
    }

    if config.write_summary {
        let total_rows = written.iter().map(|w| w.rows).sum();
        let summary = SummaryStats {
            input: config.input.clone(),
            window: config.window,
            prior_window: config.prior,
            reports: written,
            total_rows,
        };
        let path = util::sibling_path(&config.input, "-summary", "json");
        output::write_json(&path, &summary)?;
        println!("wrote summary to {:?}", path);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    if cli.notes {
        println!("{}", NOTES);
        Cli::command().print_help()?;
        return Ok(());
    }

    let Some(input) = cli.input.clone() else {
        Cli::command().print_help()?;
        return Err(ReportError::Config("a CSV file to read is required".to_string()).into());
    };

    let config = build_config(&cli, input)?;
    run(&config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_the_quarterly_report() {
        let cli = Cli::try_parse_from(["gem-report", "mining.csv"]).unwrap();
        assert_eq!(cli.start_date, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(cli.end_date, NaiveDate::from_ymd_opt(2015, 7, 1).unwrap());
        assert_eq!(
            cli.reports,
            vec![ReportKind::TotalGoldRank, ReportKind::MarketShare]
        );
        let config = build_config(&cli, PathBuf::from("mining.csv")).unwrap();
        assert_eq!(config.prior.start, NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
        assert_eq!(config.prior.end, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    }

    #[test]
    fn report_list_is_comma_separated() {
        let cli = Cli::try_parse_from(["gem-report", "-r", "allco,npsp,allco", "x.csv"]).unwrap();
        let config = build_config(&cli, PathBuf::from("x.csv")).unwrap();
        assert_eq!(
            config.reports,
            vec![ReportKind::ColorTotals, ReportKind::DonorImport]
        );
    }

    #[test]
    fn bad_dates_are_rejected() {
        assert!(Cli::try_parse_from(["gem-report", "-s", "01/01/2015", "x.csv"]).is_err());
        let cli =
            Cli::try_parse_from(["gem-report", "-s", "2015-07-01", "-e", "2015-01-01", "x.csv"])
                .unwrap();
        assert!(matches!(
            build_config(&cli, PathBuf::from("x.csv")),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn notes_do_not_need_an_input() {
        let cli = Cli::try_parse_from(["gem-report", "--notes"]).unwrap();
        assert!(cli.notes);
        assert!(cli.input.is_none());
    }
}
