use crate::accessor::AccessorValue;
use crate::series_key::get_series_key;
use crate::spec::{SeriesSpec, StackMode};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Canonical identity string of a series (see [`get_series_key`])
pub type SeriesKey = String;

// =============================================================================
// Scalars
// =============================================================================

/// A primitive value as it appears in x positions, split values and panel
/// coordinates. `1` and `"1"` are distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(OrderedFloat<f64>),
    Text(String),
}

/// X values share the scalar representation
pub type XValue = ScalarValue;

impl ScalarValue {
    pub fn number(v: f64) -> Self {
        ScalarValue::Number(OrderedFloat(v))
    }

    pub fn text(s: impl Into<String>) -> Self {
        ScalarValue::Text(s.into())
    }

    /// Accept only strings and numbers; everything else is not a scalar
    pub fn from_accessor_value(value: &AccessorValue) -> Option<Self> {
        match value {
            AccessorValue::Number(v) => Some(Self::number(*v)),
            AccessorValue::Text(s) => Some(Self::text(s.clone())),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(v) => Some(v.0),
            ScalarValue::Text(_) => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, ScalarValue::Number(_))
    }

    /// Total order over mixed values: strings sort before numbers, numbers
    /// compare with `f64::total_cmp`, strings lexicographically.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ScalarValue::Number(a), ScalarValue::Number(b)) => a.0.total_cmp(&b.0),
            (ScalarValue::Text(a), ScalarValue::Text(b)) => a.cmp(b),
            (ScalarValue::Text(_), ScalarValue::Number(_)) => Ordering::Less,
            (ScalarValue::Number(_), ScalarValue::Text(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Number(v) if v.0.is_nan() => write!(f, "NaN"),
            ScalarValue::Number(v) if v.0.is_infinite() => {
                write!(f, "{}Infinity", if v.0 < 0.0 { "-" } else { "" })
            }
            ScalarValue::Number(v) => write!(f, "{}", v.0),
            ScalarValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::number(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

// =============================================================================
// Series identity
// =============================================================================

/// Every grouping field of a series. Two records belong to the same series
/// iff their identifiers are equal; `key` is derived from the other fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesIdentifier {
    pub key: SeriesKey,
    pub spec_id: String,
    pub group_id: String,
    pub y_accessor: String,
    pub split_accessors: IndexMap<String, ScalarValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sm_h_accessor_value: Option<ScalarValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sm_v_accessor_value: Option<ScalarValue>,
    /// Split values followed by the y accessor, used for naming
    pub series_keys: Vec<ScalarValue>,
}

impl SeriesIdentifier {
    pub fn new(
        spec_id: &str,
        group_id: &str,
        y_accessor: &str,
        split_accessors: IndexMap<String, ScalarValue>,
        sm_h_accessor_value: Option<ScalarValue>,
        sm_v_accessor_value: Option<ScalarValue>,
    ) -> Self {
        let mut series_keys: Vec<ScalarValue> = split_accessors.values().cloned().collect();
        series_keys.push(ScalarValue::text(y_accessor));

        let mut identifier = Self {
            key: String::new(),
            spec_id: spec_id.to_string(),
            group_id: group_id.to_string(),
            y_accessor: y_accessor.to_string(),
            split_accessors,
            sm_h_accessor_value,
            sm_v_accessor_value,
            series_keys,
        };
        identifier.key = get_series_key(&identifier, group_id);
        identifier
    }
}

// =============================================================================
// Series data
// =============================================================================

/// Which fields of a datum were imputed rather than read from a record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilledValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<XValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
}

/// One plotted point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSeriesDatum<'a> {
    pub x: XValue,
    pub y1: Option<f64>,
    pub y0: Option<f64>,
    /// Values as extracted, before fitting or stacking. Never rewritten.
    pub initial_y1: Option<f64>,
    pub initial_y0: Option<f64>,
    pub mark: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled: Option<FilledValue>,
    /// The raw record, `None` for synthesized points
    pub datum: Option<&'a Value>,
}

impl<'a> DataSeriesDatum<'a> {
    /// A point synthesized for an x value the series never saw
    pub fn filler(x: XValue) -> Self {
        Self {
            filled: Some(FilledValue {
                x: Some(x.clone()),
                ..Default::default()
            }),
            x,
            y1: None,
            y0: None,
            initial_y1: None,
            initial_y0: None,
            mark: None,
            datum: None,
        }
    }

    pub fn filled_mut(&mut self) -> &mut FilledValue {
        self.filled.get_or_insert_with(FilledValue::default)
    }
}

/// A series identifier plus its points. Borrows its spec and the raw
/// records for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct DataSeries<'a> {
    #[serde(flatten)]
    pub identifier: SeriesIdentifier,
    pub data: Vec<DataSeriesDatum<'a>>,
    pub is_stacked: bool,
    pub stack_mode: StackMode,
    #[serde(skip)]
    pub spec: &'a SeriesSpec,
}

impl<'a> DataSeries<'a> {
    pub fn key(&self) -> &str {
        &self.identifier.key
    }
}

/// Lightweight per-series entry used by colors and legends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesCollectionValue {
    pub banded: bool,
    pub spec_sort_index: Option<i32>,
    pub series_identifier: SeriesIdentifier,
}
