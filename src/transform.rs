use crate::aggregate::get_data_series_from_specs;
use crate::extract::CoercionWarning;
use crate::ir::{DataSeries, ScalarValue, SeriesCollectionValue, SeriesKey, XValue};
use crate::legend::{compute_legend, LegendItem};
use crate::naming::get_series_name;
use crate::palette::{custom_series_colors, get_series_colors, sorted_series_collection};
use crate::spec::{ChartConfig, ScaleType, SeriesSpec};
use crate::split::EncounterOrder;
use crate::stack::{format_data_series, sort_series_data};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Everything downstream consumers (scales, renderers, legends) need from
/// one pipeline run. Borrows the config it was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesModel<'a> {
    /// Visible series, sorted, fitted and stacked
    pub data_series: Vec<DataSeries<'a>>,
    pub series_collection: IndexMap<SeriesKey, SeriesCollectionValue>,
    pub x_values: IndexSet<XValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_scale: Option<ScaleType>,
    pub sm_h_values: IndexSet<ScalarValue>,
    pub sm_v_values: IndexSet<ScalarValue>,
    pub colors: IndexMap<SeriesKey, String>,
    pub legend: Vec<LegendItem>,
    pub warnings: Vec<CoercionWarning>,
    #[serde(skip)]
    specs: &'a [SeriesSpec],
}

impl<'a> SeriesModel<'a> {
    /// Display name of a series, hidden ones included
    pub fn series_name(&self, key: &str, is_tooltip: bool) -> Option<String> {
        let entry = self.series_collection.get(key)?;
        let identifier = &entry.series_identifier;
        let spec = self.specs.iter().find(|s| s.id == identifier.spec_id);
        let has_single_series = self.series_collection.len() == 1;
        Some(get_series_name(identifier, has_single_series, is_tooltip, spec))
    }

    pub fn series(&self, key: &str) -> Option<&DataSeries<'a>> {
        self.data_series.iter().find(|s| s.key() == key)
    }
}

/// Main entry point: run the whole series pipeline over a chart config.
///
/// 1. Split every spec and merge the results into one domain
/// 2. Sort each series along the domain
/// 3. Fit and stack
/// 4. Resolve colors and legend over the full collection
pub fn apply_transformations(config: &ChartConfig) -> SeriesModel<'_> {
    let encounter_order = EncounterOrder::from_legacy_flag(config.legacy_series_sort);

    // 1. Aggregate
    let aggregated = get_data_series_from_specs(
        &config.specs,
        &config.deselected,
        config.order_ordinal_bins_by.as_ref(),
        encounter_order,
        &config.group_by,
    );

    // 2-3. Sort and format
    let mut data_series = aggregated.data_series;
    sort_series_data(&mut data_series, &aggregated.x_values);
    let data_series = format_data_series(data_series, &aggregated.x_values);

    // 4. Colors and legend
    let custom_colors = custom_series_colors(
        &config.specs,
        &aggregated.series_collection,
        &config.custom_colors,
    );
    let ordered = sorted_series_collection(&aggregated.series_collection);
    let colors = get_series_colors(
        ordered.iter().copied(),
        &config.palette,
        &custom_colors,
        &config.overrides,
    );
    let legend = compute_legend(ordered, &colors, &config.specs, &config.deselected);

    tracing::debug!(
        series = data_series.len(),
        colors = colors.len(),
        warnings = aggregated.warnings.len(),
        "applied series transformations"
    );

    SeriesModel {
        data_series,
        series_collection: aggregated.series_collection,
        x_values: aggregated.x_values,
        fallback_scale: aggregated.fallback_scale,
        sm_h_values: aggregated.sm_h_values,
        sm_v_values: aggregated.sm_v_values,
        colors,
        legend,
        warnings: aggregated.warnings,
        specs: &config.specs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> ChartConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_pipeline_order_and_colors() {
        let config = config(json!({
            "specs": [
                {"id": "b", "x_accessor": "x", "y_accessors": ["y"], "sort_index": 1,
                 "data": [{"x": 2, "y": 1}, {"x": 1, "y": 2}]},
                {"id": "a", "x_accessor": "x", "y_accessors": ["y"], "sort_index": 0,
                 "data": [{"x": 3, "y": 3}]}
            ],
            "palette": ["red", "blue"]
        }));
        let model = apply_transformations(&config);

        let xs: Vec<String> = model.x_values.iter().map(|x| x.to_string()).collect();
        assert_eq!(xs, vec!["1", "2", "3"]);

        let first = &model.data_series[0];
        assert_eq!(first.identifier.spec_id, "b");
        assert_eq!(first.data[0].x, XValue::number(1.0));

        // spec "a" has the lower sort index and takes the first color
        let a_key = model.data_series[1].key().to_string();
        assert_eq!(model.colors[&a_key], "red");
        assert_eq!(model.colors[first.key()], "blue");
        assert_eq!(model.legend[0].key, a_key);
    }

    #[test]
    fn test_series_name_covers_hidden_series() {
        let mut config = config(json!({
            "specs": [{"id": "s", "x_accessor": "x", "y_accessors": ["y"], "split_series_accessors": ["g"],
                       "data": [{"x": 1, "y": 1, "g": "a"}, {"x": 1, "y": 2, "g": "b"}]}]
        }));
        let keys: Vec<SeriesKey> = apply_transformations(&config)
            .series_collection
            .keys()
            .cloned()
            .collect();
        config.deselected = vec![keys[1].clone()];

        let model = apply_transformations(&config);
        assert_eq!(model.data_series.len(), 1);
        assert!(model.series(&keys[1]).is_none());
        assert_eq!(model.series_name(&keys[1], false), Some("b".to_string()));
        assert_eq!(model.series_name("missing", false), None);
        assert!(model.legend[1].is_hidden);
        assert!(model.colors.contains_key(&keys[1]));
    }

    #[test]
    fn test_chart_custom_colors_yield_to_spec_colors() {
        let config = config(json!({
            "specs": [
                {"id": "s", "x_accessor": "x", "y_accessors": ["y"], "data": [{"x": 1, "y": 1}]},
                {"id": "t", "x_accessor": "x", "y_accessors": ["y"], "color": "teal", "data": [{"x": 1, "y": 1}]}
            ]
        }));
        let keys: Vec<SeriesKey> = apply_transformations(&config)
            .series_collection
            .keys()
            .cloned()
            .collect();

        let mut config = config;
        config.custom_colors.insert(keys[0].clone(), "gold".to_string());
        config.custom_colors.insert(keys[1].clone(), "gold".to_string());
        let model = apply_transformations(&config);
        assert_eq!(model.colors[&keys[0]], "gold");
        assert_eq!(model.colors[&keys[1]], "teal");
    }
}
