use crate::aggregate::{sum_by_entity, ColorTotals, EntityTotals, WeightAggregator};
use crate::config::{
    DateWindow, ReportConfig, COLOR_CAT, ELF_ID, ELF_NAME, GEM_COLOR, GEM_TYPE, GOLD, QUANTITY,
    RANK, RANK_IN_COLOR, TOTAL_WEIGHT, WEIGHT,
};
use crate::donor;
use crate::error::ReportResult;
use crate::loader::{ExtractSpec, RowSource};
use crate::lookup::{color_category, GemColorLookup};
use crate::rank::{dense_rank, rank_within_colors};
use crate::types::{MatrixRow, Record};
use crate::util::format_optional;
use clap::ValueEnum;
use once_cell::unsync::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

/// The reports this tool knows how to build. Each one is a fixed
/// combination of extract, aggregation and output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Total gold per elf with its overall rank.
    #[value(name = "tgr")]
    TotalGoldRank,
    /// Elf x gem color comparison of the reporting and prior windows.
    #[value(name = "ms")]
    MarketShare,
    /// Total weight per gem color across all elves.
    #[value(name = "allco")]
    ColorTotals,
    /// Each elf's total weight and rank within every gem color it mined.
    #[value(name = "rank")]
    ColorRank,
    /// PayPal export remapped onto the NPSP data import template.
    #[value(name = "npsp")]
    DonorImport,
}

impl ReportKind {
    /// Appended to the input's file stem to name the output.
    pub fn suffix(&self) -> &'static str {
        match self {
            ReportKind::TotalGoldRank => "-tgr",
            ReportKind::MarketShare => "-ms",
            ReportKind::ColorTotals => "-allco",
            ReportKind::ColorRank => "-rank",
            ReportKind::DonorImport => "-npsp",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::TotalGoldRank => "Total Gold Rank",
            ReportKind::MarketShare => "Market Share Analysis",
            ReportKind::ColorTotals => "All Color Totals",
            ReportKind::ColorRank => "Rank in Gem Color",
            ReportKind::DonorImport => "NPSP Donor Import",
        }
    }
}

/// A finished report, ready for the writer.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub kind: ReportKind,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

/// Builds reports for one input file, loading the gem lookup at most once.
pub struct ReportRunner<'a> {
    config: &'a ReportConfig,
    lookup: OnceCell<GemColorLookup>,
}

impl<'a> ReportRunner<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Self {
            config,
            lookup: OnceCell::new(),
        }
    }

    fn lookup(&self) -> ReportResult<&GemColorLookup> {
        self.lookup
            .get_or_try_init(|| GemColorLookup::load(&self.config.gem_lookup))
    }

    pub fn generate(&self, kind: ReportKind) -> ReportResult<ReportOutput> {
        let input = self.config.input.as_path();
        match kind {
            ReportKind::TotalGoldRank => total_gold_rank(input, self.config.window),
            ReportKind::MarketShare => market_share(
                input,
                self.lookup()?,
                self.config.window,
                self.config.prior,
            ),
            ReportKind::ColorTotals => color_totals(input, self.lookup()?, self.config.window),
            ReportKind::ColorRank => color_rank(input, self.lookup()?, self.config.window),
            ReportKind::DonorImport => donor::donor_import(input),
        }
    }
}

pub fn total_gold_rank(input: &Path, window: DateWindow) -> ReportResult<ReportOutput> {
    let columns = [ELF_NAME, GOLD];
    let rows = RowSource::open(input, &ExtractSpec::mining(&columns, window))?;
    let totals = sum_by_entity(rows, GOLD)?;
    let rows = dense_rank(totals)
        .into_iter()
        .map(|(elf, total, rank)| {
            Record::new(0)
                .with(ELF_NAME, elf)
                .with(GOLD, total.to_string())
                .with(RANK, rank.to_string())
        })
        .collect();
    Ok(ReportOutput {
        kind: ReportKind::TotalGoldRank,
        columns: vec![ELF_NAME.to_string(), GOLD.to_string(), RANK.to_string()],
        rows,
    })
}

/// Columns of the per-elf weight extracts.
const PER_ELF: [&str; 5] = [ELF_NAME, ELF_ID, GEM_TYPE, WEIGHT, QUANTITY];

/// Aggregates the market share matrix is joined from.
#[derive(Debug, Clone, Default)]
pub struct MatrixInputs {
    pub prior: EntityTotals,
    pub current: EntityTotals,
    pub color_totals: ColorTotals,
}

impl MatrixInputs {
    /// Three passes over the same file: the prior window per elf, the
    /// reporting window per elf, and the reporting window for all elves.
    pub fn read(
        input: &Path,
        lookup: &GemColorLookup,
        window: DateWindow,
        prior: DateWindow,
    ) -> ReportResult<Self> {
        let all_elves = [GEM_TYPE, WEIGHT, QUANTITY];
        let mut agg = WeightAggregator::new(lookup);

        let prior_totals =
            agg.by_entity(RowSource::open(input, &ExtractSpec::mining(&PER_ELF, prior))?)?;
        let current =
            agg.by_entity(RowSource::open(input, &ExtractSpec::mining(&PER_ELF, window))?)?;
        let color_totals =
            agg.by_color(RowSource::open(input, &ExtractSpec::mining(&all_elves, window))?)?;
        if agg.misses() > 0 {
            warn!("{} rows had a gem type missing from the lookup", agg.misses());
        }
        Ok(Self {
            prior: prior_totals,
            current,
            color_totals,
        })
    }
}

/// Header labels that carry the years being compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixColumns {
    pub prior_total: String,
    pub current_total: String,
    pub ratio: String,
    pub share: String,
    pub rank: String,
}

impl MatrixColumns {
    pub fn new(window: &DateWindow, prior: &DateWindow) -> Self {
        let (cur, pre) = if window.label() == prior.label() {
            ("Current".to_string(), "Prior".to_string())
        } else {
            (window.label().to_string(), prior.label().to_string())
        };
        Self {
            prior_total: format!("{} {}", TOTAL_WEIGHT, pre),
            current_total: format!("{} {}", TOTAL_WEIGHT, cur),
            ratio: format!("{} vs. {}", cur, pre),
            share: format!("{} Mining Market Share", cur),
            rank: format!("{} Color Rank", cur),
        }
    }

    pub fn names(&self) -> Vec<String> {
        vec![
            ELF_NAME.to_string(),
            ELF_ID.to_string(),
            COLOR_CAT.to_string(),
            GEM_COLOR.to_string(),
            self.prior_total.clone(),
            self.current_total.clone(),
            self.ratio.clone(),
            self.share.clone(),
            self.rank.clone(),
        ]
    }

    pub fn record(&self, row: &MatrixRow) -> Record {
        Record::new(0)
            .with(ELF_NAME, row.entity.as_str())
            .with(ELF_ID, row.entity_id.as_str())
            .with(COLOR_CAT, row.category.as_str())
            .with(GEM_COLOR, row.color.as_str())
            .with(self.prior_total.as_str(), format_optional(row.prior_total))
            .with(self.current_total.as_str(), format_optional(row.current_total))
            .with(self.ratio.as_str(), format_optional(row.ratio))
            .with(self.share.as_str(), format_optional(row.share))
            .with(self.rank.as_str(), format_optional(row.rank))
    }
}

/// Join the aggregates over every active elf x every known color.
///
/// Elves are those active in the reporting window; colors are everything the
/// lookup knows. Rows come out by elf name, then color. A color with no
/// category is dropped with a warning.
pub fn build_matrix(inputs: &MatrixInputs, colors: &BTreeSet<&str>) -> Vec<MatrixRow> {
    let ranks: BTreeMap<(String, String), usize> = rank_within_colors(&inputs.current)
        .into_iter()
        .map(|r| ((r.entity, r.color), r.rank))
        .collect();

    let known: Vec<(&str, &'static str)> = colors
        .iter()
        .filter_map(|color| match color_category(color) {
            Some(category) => Some((*color, category)),
            None => {
                warn!("Skipping unknown color {:?}", color);
                None
            }
        })
        .collect();

    let mut rows = Vec::new();
    for elf in inputs.current.entities() {
        let entity_id = inputs.current.entity_id(elf).unwrap_or_default();
        for (color, category) in &known {
            let prior_total = inputs.prior.get(elf, color);
            let current_total = inputs.current.get(elf, color);
            let ratio = match (current_total, prior_total) {
                (Some(cur), Some(pre)) if !pre.is_zero() => cur.checked_div(pre),
                _ => None,
            };
            let share = current_total.and_then(|cur| {
                inputs
                    .color_totals
                    .get(*color)
                    .filter(|total| !total.is_zero())
                    .and_then(|total| cur.checked_div(*total))
            });
            let rank = ranks.get(&(elf.to_string(), color.to_string())).copied();
            rows.push(MatrixRow {
                entity: elf.to_string(),
                entity_id: entity_id.to_string(),
                category: category.to_string(),
                color: color.to_string(),
                prior_total,
                current_total,
                ratio,
                share,
                rank,
            });
        }
    }
    rows
}

pub fn market_share(
    input: &Path,
    lookup: &GemColorLookup,
    window: DateWindow,
    prior: DateWindow,
) -> ReportResult<ReportOutput> {
    let inputs = MatrixInputs::read(input, lookup, window, prior)?;
    let matrix = build_matrix(&inputs, &lookup.colors());
    info!(
        "Market share: {} elves x {} colors -> {} rows",
        inputs.current.totals.len(),
        lookup.colors().len(),
        matrix.len()
    );
    let columns = MatrixColumns::new(&window, &prior);
    Ok(ReportOutput {
        kind: ReportKind::MarketShare,
        columns: columns.names(),
        rows: matrix.iter().map(|row| columns.record(row)).collect(),
    })
}

pub fn color_totals(
    input: &Path,
    lookup: &GemColorLookup,
    window: DateWindow,
) -> ReportResult<ReportOutput> {
    let columns = [GEM_TYPE, WEIGHT, QUANTITY];
    let mut agg = WeightAggregator::new(lookup);
    let totals = agg.by_color(RowSource::open(input, &ExtractSpec::mining(&columns, window))?)?;

    let mut rows = Vec::new();
    for (color, total) in &totals {
        let Some(category) = color_category(color) else {
            warn!("Skipping unknown color {:?}", color);
            continue;
        };
        rows.push(
            Record::new(0)
                .with(COLOR_CAT, category)
                .with(GEM_COLOR, color.as_str())
                .with(TOTAL_WEIGHT, total.to_string()),
        );
    }
    Ok(ReportOutput {
        kind: ReportKind::ColorTotals,
        columns: vec![
            COLOR_CAT.to_string(),
            GEM_COLOR.to_string(),
            TOTAL_WEIGHT.to_string(),
        ],
        rows,
    })
}

/// Per-color ranking of every elf active in the window, grouped by color.
pub fn color_rank(
    input: &Path,
    lookup: &GemColorLookup,
    window: DateWindow,
) -> ReportResult<ReportOutput> {
    let mut agg = WeightAggregator::new(lookup);
    let totals = agg.by_entity(RowSource::open(input, &ExtractSpec::mining(&PER_ELF, window))?)?;

    let mut rows = Vec::new();
    for ranked in rank_within_colors(&totals) {
        let Some(category) = color_category(&ranked.color) else {
            warn!("Skipping unknown color {:?}", ranked.color);
            continue;
        };
        rows.push(
            Record::new(0)
                .with(COLOR_CAT, category)
                .with(GEM_COLOR, ranked.color)
                .with(ELF_NAME, ranked.entity)
                .with(ELF_ID, ranked.entity_id)
                .with(TOTAL_WEIGHT, ranked.total.to_string())
                .with(RANK_IN_COLOR, ranked.rank.to_string()),
        );
    }
    Ok(ReportOutput {
        kind: ReportKind::ColorRank,
        columns: [COLOR_CAT, GEM_COLOR, ELF_NAME, ELF_ID, TOTAL_WEIGHT, RANK_IN_COLOR]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows,
    })
}
