// Series color resolution

use crate::ir::{SeriesCollectionValue, SeriesKey};
use crate::spec::SeriesSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;

const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

const DEFAULT_COLOR: &str = "#000000";

// =============================================================================
// Palette
// =============================================================================

/// Cycled list of colors handed out to series without an override
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    pub colors: Vec<String>,
    /// Used only when `colors` is empty
    pub default_color: String,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::category10()
    }
}

impl ColorPalette {
    /// The d3 category10 scheme
    pub fn category10() -> Self {
        Self::new(CATEGORY10.iter().map(|c| c.to_string()).collect())
    }

    pub fn new(colors: Vec<String>) -> Self {
        Self {
            colors,
            default_color: DEFAULT_COLOR.to_string(),
        }
    }

    /// Color for the `index`-th series, cycling through the palette
    pub fn color_at(&self, index: usize) -> &str {
        if self.colors.is_empty() {
            return &self.default_color;
        }
        &self.colors[index % self.colors.len()]
    }
}

impl<'de> Deserialize<'de> for ColorPalette {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        fn default_color() -> String {
            DEFAULT_COLOR.to_string()
        }

        #[derive(Deserialize)]
        struct Full {
            colors: Vec<String>,
            #[serde(default = "default_color")]
            default_color: String,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<String>),
            Full(Full),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::List(colors) => ColorPalette::new(colors),
            Repr::Full(full) => ColorPalette {
                colors: full.colors,
                default_color: full.default_color,
            },
        })
    }
}

// =============================================================================
// Overrides
// =============================================================================

/// User color overrides keyed by series key
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColorOverrides {
    /// Session-only overrides (e.g. while picking a color)
    #[serde(default)]
    pub temporary: IndexMap<SeriesKey, String>,
    /// Saved user choices
    #[serde(default)]
    pub persisted: IndexMap<SeriesKey, String>,
}

/// Override tiers, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSource {
    Temporary,
    Custom,
    Persisted,
}

const COLOR_PRECEDENCE: [ColorSource; 3] = [
    ColorSource::Temporary,
    ColorSource::Custom,
    ColorSource::Persisted,
];

fn override_for<'c>(
    key: &str,
    custom_colors: &'c IndexMap<SeriesKey, String>,
    overrides: &'c ColorOverrides,
) -> Option<&'c str> {
    COLOR_PRECEDENCE.iter().find_map(|source| {
        let map = match source {
            ColorSource::Temporary => &overrides.temporary,
            ColorSource::Custom => custom_colors,
            ColorSource::Persisted => &overrides.persisted,
        };
        map.get(key).map(String::as_str).filter(|c| !c.is_empty())
    })
}

// =============================================================================
// Resolution
// =============================================================================

/// Sort-index comparator: series with an index come first, by index; those
/// without one sort after all of them.
pub fn compare_sort_index(a: Option<i32>, b: Option<i32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Collection entries ordered by spec sort index, insertion order on ties
pub fn sorted_series_collection(
    collection: &IndexMap<SeriesKey, SeriesCollectionValue>,
) -> Vec<&SeriesCollectionValue> {
    let mut entries: Vec<&SeriesCollectionValue> = collection.values().collect();
    entries.sort_by(|a, b| compare_sort_index(a.spec_sort_index, b.spec_sort_index));
    entries
}

/// Custom colors declared on the specs, resolved for each series of the
/// collection. Entries of `base` are kept unless a spec color replaces them.
pub fn custom_series_colors(
    specs: &[SeriesSpec],
    collection: &IndexMap<SeriesKey, SeriesCollectionValue>,
    base: &IndexMap<SeriesKey, String>,
) -> IndexMap<SeriesKey, String> {
    let mut colors = base.clone();
    for entry in collection.values() {
        let identifier = &entry.series_identifier;
        let color = specs
            .iter()
            .find(|spec| spec.id == identifier.spec_id)
            .and_then(|spec| spec.color.as_ref())
            .and_then(|color| color.color_for(identifier));
        if let Some(color) = color {
            colors.insert(identifier.key.clone(), color);
        }
    }
    colors
}

/// Resolve one color per series.
///
/// `series` is iterated in the order supplied; the palette position advances
/// for every series, overridden or not, so overriding one series never
/// shifts the colors of the others. Precedence: temporary override, custom
/// color, persisted override, palette.
pub fn get_series_colors<'s, I>(
    series: I,
    palette: &ColorPalette,
    custom_colors: &IndexMap<SeriesKey, String>,
    overrides: &ColorOverrides,
) -> IndexMap<SeriesKey, String>
where
    I: IntoIterator<Item = &'s SeriesCollectionValue>,
{
    series
        .into_iter()
        .enumerate()
        .map(|(counter, entry)| {
            let key = &entry.series_identifier.key;
            let color = override_for(key, custom_colors, overrides)
                .unwrap_or_else(|| palette.color_at(counter));
            (key.clone(), color.to_string())
        })
        .collect()
}
