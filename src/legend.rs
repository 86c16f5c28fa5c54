// Legend items for every series of a chart

use crate::ir::{SeriesCollectionValue, SeriesKey};
use crate::naming::get_series_name;
use crate::spec::SeriesSpec;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub key: SeriesKey,
    pub name: String,
    pub color: String,
    /// Deselected series are listed but hidden
    pub is_hidden: bool,
    pub is_banded: bool,
    pub spec_id: String,
}

/// One legend item per collection entry, in the order supplied (the color
/// order). Series without a resolved color get an empty color.
pub fn compute_legend<'s, I>(
    series: I,
    colors: &IndexMap<SeriesKey, String>,
    specs: &[SeriesSpec],
    deselected: &[SeriesKey],
) -> Vec<LegendItem>
where
    I: IntoIterator<Item = &'s SeriesCollectionValue>,
    I::IntoIter: ExactSizeIterator,
{
    let series = series.into_iter();
    let has_single_series = series.len() == 1;

    series
        .map(|entry| {
            let identifier = &entry.series_identifier;
            let spec = specs.iter().find(|s| s.id == identifier.spec_id);
            LegendItem {
                key: identifier.key.clone(),
                name: get_series_name(identifier, has_single_series, false, spec),
                color: colors.get(&identifier.key).cloned().unwrap_or_default(),
                is_hidden: deselected.contains(&identifier.key),
                is_banded: entry.banded,
                spec_id: identifier.spec_id.clone(),
            }
        })
        .collect()
}
