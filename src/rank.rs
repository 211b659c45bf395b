// Dense ranking of decimal totals.
//
// Ranks run 1..N by descending total. Equal totals still get distinct,
// consecutive ranks: the smaller key (elf name) ranks first, so the output
// never depends on map iteration or sort stability.
use crate::aggregate::EntityTotals;
use crate::types::RankedRow;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub fn dense_rank<K, I>(values: I) -> Vec<(K, Decimal, usize)>
where
    K: Ord,
    I: IntoIterator<Item = (K, Decimal)>,
{
    let mut sorted: Vec<(K, Decimal)> = values.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, (key, total))| (key, total, idx + 1))
        .collect()
}

/// Rank every elf within each gem color.
///
/// Rows come out grouped by color (ascending), then by rank.
pub fn rank_within_colors(totals: &EntityTotals) -> Vec<RankedRow> {
    let mut by_color: BTreeMap<&str, Vec<(&str, Decimal)>> = BTreeMap::new();
    for (elf, colors) in &totals.totals {
        for (color, total) in colors {
            by_color
                .entry(color.as_str())
                .or_default()
                .push((elf.as_str(), *total));
        }
    }

    let mut rows = Vec::new();
    for (color, elves) in by_color {
        for (elf, total, rank) in dense_rank(elves) {
            rows.push(RankedRow {
                entity: elf.to_string(),
                entity_id: totals.entity_id(elf).unwrap_or_default().to_string(),
                color: color.to_string(),
                total,
                rank,
            });
        }
    }
    rows
}
