// Global aggregation across every spec of a chart

use crate::extract::CoercionWarning;
use crate::ir::{DataSeries, ScalarValue, SeriesCollectionValue, SeriesKey, XValue};
use crate::ordinal::get_sorted_ordinal_x_values;
use crate::spec::{GroupBySpec, OrderBy, ScaleType, SeriesSpec};
use crate::split::{split_series_data_by_accessors, EncounterOrder, XValueSums};
use indexmap::{IndexMap, IndexSet};
use std::cmp::Ordering;

/// Merged result of splitting every spec
#[derive(Debug, Clone)]
pub struct DataSeriesFromSpecs<'a> {
    /// Visible series, in spec order then first-seen order
    pub data_series: Vec<DataSeries<'a>>,
    /// Every series, hidden ones included, without data
    pub series_collection: IndexMap<SeriesKey, SeriesCollectionValue>,
    pub x_values: IndexSet<XValue>,
    /// Set when no spec declared an ordinal scale but the domain holds strings
    pub fallback_scale: Option<ScaleType>,
    pub sm_h_values: IndexSet<ScalarValue>,
    pub sm_v_values: IndexSet<ScalarValue>,
    pub x_value_sums: XValueSums,
    pub warnings: Vec<CoercionWarning>,
}

/// Comparator used for continuous domains
pub fn compare_x_values(a: &XValue, b: &XValue) -> Ordering {
    a.total_cmp(b)
}

/// Split and merge every spec.
///
/// A fresh x-sum accumulator is created for each call. Deselected series are
/// left out of `data_series` by key but stay in the series collection.
pub fn get_data_series_from_specs<'a>(
    specs: &'a [SeriesSpec],
    deselected: &[SeriesKey],
    order_ordinal_bins_by: Option<&OrderBy>,
    encounter_order: EncounterOrder,
    group_by: &GroupBySpec,
) -> DataSeriesFromSpecs<'a> {
    let mut data_series = Vec::new();
    let mut series_collection = IndexMap::new();
    let mut x_value_sums = XValueSums::new();
    let mut global_x_values: IndexSet<XValue> = IndexSet::new();
    let mut sm_h_values = IndexSet::new();
    let mut sm_v_values = IndexSet::new();
    let mut warnings = Vec::new();

    let deselected: IndexSet<&str> = deselected.iter().map(String::as_str).collect();
    let mut is_number_array = true;
    let mut is_ordinal_scale = false;

    for spec in specs {
        if spec.x_scale_type == ScaleType::Ordinal {
            is_ordinal_scale = true;
        }

        let split = split_series_data_by_accessors(
            spec,
            &mut x_value_sums,
            spec.stacked,
            encounter_order,
            spec.stack_mode,
            group_by,
        );

        let banded = spec.is_banded();
        for (key, series) in &split.data_series {
            series_collection.insert(
                key.clone(),
                SeriesCollectionValue {
                    banded,
                    spec_sort_index: spec.sort_index,
                    series_identifier: series.identifier.clone(),
                },
            );
        }

        data_series.extend(
            split
                .data_series
                .into_values()
                .filter(|series| !deselected.contains(series.key())),
        );

        is_number_array = is_number_array && split.x_values.iter().all(XValue::is_number);
        global_x_values.extend(split.x_values);
        sm_h_values.extend(split.sm_h_values);
        sm_v_values.extend(split.sm_v_values);
        warnings.extend(split.warning);
    }

    let x_values = if is_ordinal_scale || !is_number_array {
        get_sorted_ordinal_x_values(global_x_values, &x_value_sums, order_ordinal_bins_by)
    } else {
        let mut sorted: Vec<XValue> = global_x_values.into_iter().collect();
        sorted.sort_by(compare_x_values);
        sorted.into_iter().collect()
    };

    let fallback_scale = if !is_ordinal_scale && !is_number_array {
        Some(ScaleType::Ordinal)
    } else {
        None
    };

    tracing::debug!(
        series = data_series.len(),
        collection = series_collection.len(),
        domain = x_values.len(),
        fallback_to_ordinal = fallback_scale.is_some(),
        "aggregated series from specs"
    );

    DataSeriesFromSpecs {
        data_series,
        series_collection,
        x_values,
        fallback_scale,
        sm_h_values,
        sm_v_values,
        x_value_sums,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{BinAgg, Direction};
    use serde_json::json;

    fn specs(value: serde_json::Value) -> Vec<SeriesSpec> {
        serde_json::from_value(value).unwrap()
    }

    fn run<'a>(specs: &'a [SeriesSpec], deselected: &[SeriesKey], order: Option<&OrderBy>) -> DataSeriesFromSpecs<'a> {
        get_data_series_from_specs(specs, deselected, order, EncounterOrder::RecordMajor, &GroupBySpec::default())
    }

    fn domain(out: &DataSeriesFromSpecs<'_>) -> Vec<String> {
        out.x_values.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_numeric_domain_is_sorted_and_deduplicated() {
        let specs = specs(json!([
            {"id": "a", "x_accessor": "x", "y_accessors": ["y"], "data": [{"x": 3, "y": 1}, {"x": 1, "y": 1}]},
            {"id": "b", "x_accessor": "x", "y_accessors": ["y"], "data": [{"x": 2, "y": 1}, {"x": 3, "y": 1}]}
        ]));
        let out = run(&specs, &[], None);
        assert_eq!(domain(&out), vec!["1", "2", "3"]);
        assert_eq!(out.fallback_scale, None);
        assert_eq!(out.data_series.len(), 2);
    }

    #[test]
    fn test_string_values_fall_back_to_ordinal() {
        let specs = specs(json!([
            {"id": "a", "x_accessor": "x", "y_accessors": ["y"], "data": [{"x": 3, "y": 1}, {"x": "b", "y": 1}, {"x": 1, "y": 1}]}
        ]));
        let out = run(&specs, &[], None);
        assert_eq!(domain(&out), vec!["3", "b", "1"]);
        assert_eq!(out.fallback_scale, Some(ScaleType::Ordinal));
    }

    #[test]
    fn test_declared_ordinal_scale_keeps_order_without_fallback() {
        let specs = specs(json!([
            {"id": "a", "x_accessor": "x", "y_accessors": ["y"], "x_scale_type": "ordinal",
             "data": [{"x": 3, "y": 1}, {"x": 1, "y": 5}, {"x": 2, "y": 2}]}
        ]));
        let out = run(&specs, &[], None);
        assert_eq!(domain(&out), vec!["3", "1", "2"]);
        assert_eq!(out.fallback_scale, None);

        let order = OrderBy {
            bin_agg: BinAgg::Sum,
            direction: Direction::Descending,
        };
        let out = run(&specs, &[], Some(&order));
        assert_eq!(domain(&out), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_continuous_scale_kinds_share_the_numeric_domain() {
        for scale in ["time", "log", "sqrt"] {
            let specs = specs(json!([
                {"id": "a", "x_accessor": "x", "y_accessors": ["y"], "x_scale_type": scale,
                 "data": [{"x": 30, "y": 1}, {"x": 10, "y": 1}, {"x": 20, "y": 1}]}
            ]));
            let out = run(&specs, &[], None);
            assert_eq!(domain(&out), vec!["10", "20", "30"], "{}", scale);
            assert_eq!(out.fallback_scale, None, "{}", scale);
        }
    }

    #[test]
    fn test_deselected_series_stay_in_collection() {
        let specs = specs(json!([
            {"id": "a", "x_accessor": "x", "y_accessors": ["y"], "split_series_accessors": ["g"], "sort_index": 2,
             "y0_accessors": ["lo"],
             "data": [{"x": 1, "y": 1, "g": "p"}, {"x": 1, "y": 2, "g": "q"}]}
        ]));
        let all = run(&specs, &[], None);
        let hidden_key = all.data_series[0].key().to_string();

        let out = run(&specs, &[hidden_key.clone()], None);
        assert_eq!(out.data_series.len(), 1);
        assert_ne!(out.data_series[0].key(), hidden_key);
        assert_eq!(out.series_collection.len(), 2);

        let entry = &out.series_collection[&hidden_key];
        assert!(entry.banded);
        assert_eq!(entry.spec_sort_index, Some(2));
        assert_eq!(entry.series_identifier.key, hidden_key);
    }

    #[test]
    fn test_aggregation_is_repeatable() {
        let specs = specs(json!([
            {"id": "a", "x_accessor": "x", "y_accessors": ["y", "z"], "split_series_accessors": ["g"],
             "data": [{"x": "m", "y": 1, "z": 2, "g": "p"}, {"x": "n", "y": 3, "z": 4, "g": "q"}]}
        ]));
        let order = OrderBy {
            bin_agg: BinAgg::Sum,
            direction: Direction::Ascending,
        };
        let first = run(&specs, &[], Some(&order));
        let second = run(&specs, &[], Some(&order));

        assert_eq!(first.x_values, second.x_values);
        let keys = |o: &DataSeriesFromSpecs<'_>| o.data_series.iter().map(|s| s.key().to_string()).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first.x_value_sums.get(&XValue::text("n")), Some(7.0));
    }

    #[test]
    fn test_warnings_are_collected_per_spec() {
        let specs = specs(json!([
            {"id": "a", "x_accessor": "x", "y_accessors": ["y"], "data": [{"x": 1, "y": "bad"}]},
            {"id": "b", "x_accessor": "x", "y_accessors": ["y"], "data": [{"x": 1, "y": 2}]}
        ]));
        let out = run(&specs, &[], None);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].spec_id, "a");
    }
}
