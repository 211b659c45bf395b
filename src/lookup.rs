// Gem reference data: the gem-type -> color side file and the fixed
// color -> color category table.
use crate::config::{COLOR, GEM_TYPE};
use crate::error::ReportResult;
use crate::loader::{ExtractSpec, RowSource};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

/// Coarser grouping of gem colors used by the market share report.
static COLOR_CATEGORIES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("Cerulean", "Blue"),
        ("Teal", "Blue"),
        ("Cyan", "Blue"),
        ("Azure", "Blue"),
        ("Turquoise", "Blue"),
        ("Green", "Green"),
        ("Purple", "Purple"),
        ("Orange", "Orange"),
        ("Red", "Red"),
        ("Brown", "Brown"),
        ("Yellow", "Yellow"),
        ("Magenta", "Magenta"),
        ("Fuscia", "Magenta"),
    ])
});

pub fn color_category(color: &str) -> Option<&'static str> {
    COLOR_CATEGORIES.get(color).copied()
}

/// Gem type to gem color, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct GemColorLookup {
    colors: HashMap<String, String>,
}

impl GemColorLookup {
    /// Read the two-column reference file. No rows are filtered out; a gem
    /// type listed twice keeps its last color.
    pub fn load(path: &Path) -> ReportResult<Self> {
        let columns = [GEM_TYPE, COLOR];
        let pairs = RowSource::open(path, &ExtractSpec::all(&columns))?
            .map(|row| -> ReportResult<(String, String)> {
                let row = row?;
                Ok((
                    row.require(GEM_TYPE)?.to_string(),
                    row.require(COLOR)?.to_string(),
                ))
            })
            .collect::<ReportResult<Vec<(String, String)>>>()?;
        let lookup: Self = pairs.into_iter().collect();
        info!("Loaded {} gem types from {}", lookup.len(), path.display());
        Ok(lookup)
    }

    pub fn color_of(&self, gem_type: &str) -> Option<&str> {
        self.colors.get(gem_type).map(String::as_str)
    }

    /// Every color the reference file knows about, sorted.
    pub fn colors(&self) -> BTreeSet<&str> {
        self.colors.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }
}

impl<K, V> FromIterator<(K, V)> for GemColorLookup
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        Self {
            colors: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
