// Series splitting: one spec's raw dataset -> keyed series
//
// All maps and sets here are insertion ordered (`IndexMap`/`IndexSet`);
// series order and panel order are the order in which records introduce
// them, which keeps colors and identity stable across re-renders.

use crate::accessor::Accessor;
use crate::extract::{extract_y_and_mark, CoercionWarning, NonNumericValues};
use crate::ir::{DataSeries, DataSeriesDatum, ScalarValue, SeriesIdentifier, SeriesKey, XValue};
use crate::spec::{GroupBySpec, PanelAccessor, SeriesSpec, StackMode};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// Panel value used when no panel grouping applies to a record
pub const DEFAULT_SINGLE_PANEL_SM_VALUE: &str = "__gramseries_single_panel__";

/// Running per-x sums of y1 across every spec of one pipeline run.
///
/// Created fresh for each run and owned by that run; it feeds ordinal
/// ordering and must never be reused.
#[derive(Debug, Clone, Default)]
pub struct XValueSums {
    sums: IndexMap<XValue, f64>,
}

impl XValueSums {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: &XValue, value: f64) {
        *self.sums.entry(x.clone()).or_insert(0.0) += value;
    }

    pub fn get(&self, x: &XValue) -> Option<f64> {
        self.sums.get(x).copied()
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

/// Order in which (record, y accessor) pairs are visited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncounterOrder {
    /// Every y accessor of a record before the next record
    #[default]
    RecordMajor,
    /// Every record for one y accessor before the next accessor (legacy sort)
    AccessorMajor,
}

impl EncounterOrder {
    pub fn from_legacy_flag(legacy_series_sort: bool) -> Self {
        if legacy_series_sort {
            EncounterOrder::AccessorMajor
        } else {
            EncounterOrder::RecordMajor
        }
    }

    fn visits(self, records: usize, accessors: usize) -> Vec<(usize, usize)> {
        match self {
            EncounterOrder::RecordMajor => (0..records)
                .flat_map(|r| (0..accessors).map(move |a| (r, a)))
                .collect(),
            EncounterOrder::AccessorMajor => (0..accessors)
                .flat_map(|a| (0..records).map(move |r| (r, a)))
                .collect(),
        }
    }
}

/// Output of splitting one spec
#[derive(Debug, Clone)]
pub struct SplitSeries<'a> {
    /// Series in first-seen order, data unsorted
    pub data_series: IndexMap<SeriesKey, DataSeries<'a>>,
    /// Every accepted x value, with duplicates
    pub x_values: Vec<XValue>,
    pub sm_h_values: IndexSet<ScalarValue>,
    pub sm_v_values: IndexSet<ScalarValue>,
    pub warning: Option<CoercionWarning>,
}

/// A record that passed the shape checks
struct AcceptedRecord<'a> {
    datum: &'a Value,
    x: XValue,
    split_accessors: IndexMap<String, ScalarValue>,
    sm_h: ScalarValue,
    sm_v: ScalarValue,
}

/// Resolve split values; only strings and numbers count
fn get_split_accessors(datum: &Value, accessors: &[Accessor]) -> IndexMap<String, ScalarValue> {
    let mut split = IndexMap::new();
    for accessor in accessors {
        if let Some(value) = ScalarValue::from_accessor_value(&accessor.get(datum)) {
            split.insert(accessor.name(), value);
        }
    }
    split
}

fn panel_value(panel: Option<&PanelAccessor>, spec: &SeriesSpec, datum: &Value) -> ScalarValue {
    panel
        .and_then(|p| p.panel_value(spec, datum))
        .unwrap_or_else(|| ScalarValue::text(DEFAULT_SINGLE_PANEL_SM_VALUE))
}

fn accept_record<'a>(
    spec: &SeriesSpec,
    datum: &'a Value,
    group_by: &GroupBySpec,
) -> Option<AcceptedRecord<'a>> {
    if !datum.is_object() && !datum.is_array() {
        return None;
    }

    // With mandatory splitting, records that resolve no split value are dropped
    let split_accessors = get_split_accessors(datum, &spec.split_series_accessors);
    if !spec.split_series_accessors.is_empty() && split_accessors.is_empty() {
        return None;
    }

    let x = ScalarValue::from_accessor_value(&spec.x_accessor.get(datum))?;

    Some(AcceptedRecord {
        datum,
        x,
        split_accessors,
        sm_h: panel_value(group_by.horizontal.as_ref(), spec, datum),
        sm_v: panel_value(group_by.vertical.as_ref(), spec, datum),
    })
}

/// Split one spec's dataset into series keyed by their canonical key.
///
/// Records are dropped when they are not composite (object or array), when
/// their x is neither string nor number, or when split accessors are
/// configured but none resolves. Every y accessor's y1 (null counts as 0) is
/// added to `x_value_sums`.
pub fn split_series_data_by_accessors<'a>(
    spec: &'a SeriesSpec,
    x_value_sums: &mut XValueSums,
    is_stacked: bool,
    encounter_order: EncounterOrder,
    stack_mode: StackMode,
    group_by: &GroupBySpec,
) -> SplitSeries<'a> {
    let mut data_series: IndexMap<SeriesKey, DataSeries<'a>> = IndexMap::new();
    let mut sm_h_values = IndexSet::new();
    let mut sm_v_values = IndexSet::new();
    let mut offenders = NonNumericValues::new();

    let records: Vec<AcceptedRecord<'a>> = spec
        .data
        .iter()
        .filter_map(|datum| accept_record(spec, datum, group_by))
        .collect();

    let mut x_values = Vec::with_capacity(records.len());
    for record in &records {
        x_values.push(record.x.clone());
        sm_h_values.insert(record.sm_h.clone());
        sm_v_values.insert(record.sm_v.clone());
    }

    for (record_idx, accessor_idx) in encounter_order.visits(records.len(), spec.y_accessors.len()) {
        let record = &records[record_idx];
        let y_accessor = &spec.y_accessors[accessor_idx];

        let extracted = extract_y_and_mark(
            record.datum,
            y_accessor,
            &mut offenders,
            spec.y0_accessor(accessor_idx),
            spec.mark_size_accessor.as_ref(),
        );

        let identifier = SeriesIdentifier::new(
            &spec.id,
            &spec.group_id,
            &y_accessor.name(),
            record.split_accessors.clone(),
            Some(record.sm_h.clone()),
            Some(record.sm_v.clone()),
        );

        x_value_sums.add(&record.x, extracted.y1.unwrap_or(0.0));

        let datum = DataSeriesDatum {
            x: record.x.clone(),
            y1: extracted.y1,
            y0: extracted.y0,
            initial_y1: extracted.initial_y1,
            initial_y0: extracted.initial_y0,
            mark: extracted.mark,
            filled: None,
            datum: Some(extracted.datum),
        };

        data_series
            .entry(identifier.key.clone())
            .or_insert_with(|| DataSeries {
                identifier,
                data: Vec::new(),
                is_stacked,
                stack_mode,
                spec,
            })
            .data
            .push(datum);
    }

    let warning = offenders.warn_if_any(&spec.id);

    tracing::debug!(
        spec_id = %spec.id,
        series = data_series.len(),
        records = records.len(),
        "split spec into series"
    );

    SplitSeries {
        data_series,
        x_values,
        sm_h_values,
        sm_v_values,
        warning,
    }
}
