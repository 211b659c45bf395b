use crate::config::{ELF_ID, ELF_NAME, GEM_TYPE, QUANTITY, WEIGHT};
use crate::error::{ReportError, ReportResult};
use crate::lookup::GemColorLookup;
use crate::types::Record;
use crate::util::parse_decimal;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// Total weight per gem color.
pub type ColorTotals = BTreeMap<String, Decimal>;

/// Total weight per elf per gem color, plus the elf's id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTotals {
    pub totals: BTreeMap<String, ColorTotals>,
    pub ids: BTreeMap<String, String>,
}

impl EntityTotals {
    pub fn get(&self, entity: &str, color: &str) -> Option<Decimal> {
        self.totals.get(entity)?.get(color).copied()
    }

    /// Elves seen in the extract, ascending by name.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.totals.keys().map(String::as_str)
    }

    pub fn entity_id(&self, entity: &str) -> Option<&str> {
        self.ids.get(entity).map(String::as_str)
    }
}

fn accumulate(total: &mut Decimal, amount: Decimal, line: u64) -> ReportResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| ReportError::parse(line, "running total overflows"))?;
    Ok(())
}

/// Sums `weight * quantity` by gem color, resolving each row's gem type
/// through the lookup. Rows whose gem type is unknown contribute nothing.
pub struct WeightAggregator<'a> {
    lookup: &'a GemColorLookup,
    misses: usize,
}

impl<'a> WeightAggregator<'a> {
    pub fn new(lookup: &'a GemColorLookup) -> Self {
        Self { lookup, misses: 0 }
    }

    /// Rows dropped so far because their gem type had no color.
    pub fn misses(&self) -> usize {
        self.misses
    }

    fn weighted(&mut self, row: &Record) -> ReportResult<Option<(&'a str, Decimal)>> {
        let line = row.line();
        let gem_type = row.require(GEM_TYPE)?;
        let lookup = self.lookup;
        let Some(color) = lookup.color_of(gem_type) else {
            warn!("Skipping row {}: unknown gem type {:?}", line, gem_type);
            self.misses += 1;
            return Ok(None);
        };
        let weight = parse_decimal(row.require(WEIGHT)?, WEIGHT, line)?;
        let quantity = parse_decimal(row.require(QUANTITY)?, QUANTITY, line)?;
        let grams = weight
            .checked_mul(quantity)
            .ok_or_else(|| ReportError::parse(line, "weight times quantity overflows"))?;
        Ok(Some((color, grams)))
    }

    /// Per-elf totals. An elf with only unknown gem types is still recorded
    /// as active, with no color totals.
    pub fn by_entity<I>(&mut self, rows: I) -> ReportResult<EntityTotals>
    where
        I: IntoIterator<Item = ReportResult<Record>>,
    {
        let mut out = EntityTotals::default();
        for row in rows {
            let row = row?;
            let elf = row.require(ELF_NAME)?.to_string();
            out.ids.insert(elf.clone(), row.require(ELF_ID)?.to_string());
            let colors = out.totals.entry(elf).or_default();
            if let Some((color, grams)) = self.weighted(&row)? {
                let total = colors.entry(color.to_string()).or_default();
                accumulate(total, grams, row.line())?;
            }
        }
        Ok(out)
    }

    /// All-elves totals, keyed by color only. Used as the market total.
    pub fn by_color<I>(&mut self, rows: I) -> ReportResult<ColorTotals>
    where
        I: IntoIterator<Item = ReportResult<Record>>,
    {
        let mut out = ColorTotals::new();
        for row in rows {
            let row = row?;
            if let Some((color, grams)) = self.weighted(&row)? {
                let total = out.entry(color.to_string()).or_default();
                accumulate(total, grams, row.line())?;
            }
        }
        Ok(out)
    }
}

/// Plain decimal sum of `column` per elf.
pub fn sum_by_entity<I>(rows: I, column: &str) -> ReportResult<BTreeMap<String, Decimal>>
where
    I: IntoIterator<Item = ReportResult<Record>>,
{
    let mut out: BTreeMap<String, Decimal> = BTreeMap::new();
    for row in rows {
        let row = row?;
        let amount = parse_decimal(row.require(column)?, column, row.line())?;
        let total = out.entry(row.require(ELF_NAME)?.to_string()).or_default();
        accumulate(total, amount, row.line())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lookup() -> GemColorLookup {
        GemColorLookup::from_iter([("Ruby", "Red"), ("Garnet", "Red"), ("Topaz", "Yellow")])
    }

    fn gem_row(
        line: u64,
        elf: &str,
        id: &str,
        gem: &str,
        weight: &str,
        qty: &str,
    ) -> ReportResult<Record> {
        Ok(Record::new(line)
            .with(ELF_NAME, elf)
            .with(ELF_ID, id)
            .with(GEM_TYPE, gem)
            .with(WEIGHT, weight)
            .with(QUANTITY, qty))
    }

    #[test]
    fn sums_weight_times_quantity_per_elf_and_color() {
        let lookup = lookup();
        let mut agg = WeightAggregator::new(&lookup);
        let totals = agg
            .by_entity(vec![
                gem_row(2, "Alwen", "7", "Ruby", "12.50", "4"),
                gem_row(3, "Alwen", "7", "Garnet", "0.25", "2"),
                gem_row(4, "Brin", "9", "Topaz", "3", "1"),
            ])
            .unwrap();
        assert_eq!(totals.get("Alwen", "Red"), Some(dec("50.50")));
        assert_eq!(totals.get("Brin", "Yellow"), Some(dec("3")));
        assert_eq!(totals.get("Brin", "Red"), None);
        assert_eq!(totals.entity_id("Alwen"), Some("7"));
        assert_eq!(totals.entities().collect::<Vec<_>>(), vec!["Alwen", "Brin"]);
    }

    #[test]
    fn unknown_gem_type_is_excluded_but_elf_stays_active() {
        let lookup = lookup();
        let mut agg = WeightAggregator::new(&lookup);
        let totals = agg
            .by_entity(vec![
                gem_row(2, "Alwen", "7", "Unobtainium", "100", "100"),
                gem_row(3, "Brin", "9", "Ruby", "1", "1"),
            ])
            .unwrap();
        assert_eq!(agg.misses(), 1);
        assert!(totals.totals["Alwen"].is_empty());
        assert_eq!(totals.get("Brin", "Red"), Some(dec("1")));

        let by_color = agg
            .by_color(vec![
                gem_row(2, "Alwen", "7", "Unobtainium", "100", "100"),
                gem_row(3, "Brin", "9", "Ruby", "1", "1"),
            ])
            .unwrap();
        assert_eq!(agg.misses(), 2);
        assert_eq!(by_color.len(), 1);
        assert_eq!(by_color["Red"], dec("1"));
    }

    #[test]
    fn all_elves_variant_ignores_the_elf() {
        let lookup = lookup();
        let mut agg = WeightAggregator::new(&lookup);
        let totals = agg
            .by_color(vec![
                gem_row(2, "Alwen", "7", "Ruby", "2", "3"),
                gem_row(3, "Brin", "9", "Garnet", "1", "4"),
                gem_row(4, "Brin", "9", "Topaz", "0.5", "2"),
            ])
            .unwrap();
        assert_eq!(totals["Red"], dec("10"));
        assert_eq!(totals["Yellow"], dec("1.0"));
    }

    #[test]
    fn bad_weight_aborts_with_line() {
        let lookup = lookup();
        let mut agg = WeightAggregator::new(&lookup);
        let err = agg
            .by_entity(vec![gem_row(5, "Alwen", "7", "Ruby", "heavy", "1")])
            .unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 5, .. }));
    }

    #[test]
    fn gold_sums_are_exact() {
        let rows = vec![
            Ok(Record::new(2).with(ELF_NAME, "Alwen").with("Gold", "0.10")),
            Ok(Record::new(3).with(ELF_NAME, "Alwen").with("Gold", "0.20")),
            Ok(Record::new(4).with(ELF_NAME, "Brin").with("Gold", "5")),
        ];
        let totals = sum_by_entity(rows, "Gold").unwrap();
        assert_eq!(totals["Alwen"], dec("0.3"));
        assert_eq!(totals["Alwen"].to_string(), "0.30");
        assert_eq!(totals["Brin"], dec("5"));
    }

    #[test]
    fn upstream_errors_propagate() {
        let rows: Vec<ReportResult<Record>> = vec![Err(ReportError::parse(8, "broken quote"))];
        assert!(matches!(
            sum_by_entity(rows, "Gold"),
            Err(ReportError::Parse { line: 8, .. })
        ));
    }
}
