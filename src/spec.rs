// Series specifications and chart configuration

use crate::accessor::Accessor;
use crate::ir::{ScalarValue, SeriesIdentifier, SeriesKey};
use crate::palette::{ColorOverrides, ColorPalette};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Group id used when a spec does not name one
pub const DEFAULT_GLOBAL_ID: &str = "__global__";

fn default_group_id() -> String {
    DEFAULT_GLOBAL_ID.to_string()
}

// =============================================================================
// Scale and stacking
// =============================================================================

/// Scale of a spec's x axis.
///
/// The pipeline only tells ordinal apart from continuous: every kind other
/// than `Ordinal` gets a numeric domain when all x values are numbers. The
/// continuous kinds are kept so the renderer can pick the matching scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    #[default]
    Linear,
    Ordinal,
    Time,
    Log,
    Sqrt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackMode {
    #[default]
    None,
    Percentage,
    Silhouette,
    Wiggle,
}

// =============================================================================
// Fitting
// =============================================================================

/// Policy for imputing a missing y value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFunction {
    #[default]
    None,
    Zero,
    Explicit,
    Carry,
    Lookahead,
    Nearest,
    Average,
    Linear,
}

/// Value used for leading/trailing gaps the fit function cannot reach
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndValue {
    Nearest,
    Explicit(f64),
}

impl<'de> Deserialize<'de> for EndValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Keyword(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(EndValue::Explicit(v)),
            Repr::Keyword(k) if k == "nearest" => Ok(EndValue::Nearest),
            Repr::Keyword(k) => Err(serde::de::Error::custom(format!(
                "unknown end value '{}', expected \"nearest\" or a number",
                k
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitConfig {
    pub function: FitFunction,
    /// Used by [`FitFunction::Explicit`]
    pub value: Option<f64>,
    pub end_value: Option<EndValue>,
}

impl FitConfig {
    pub fn new(function: FitFunction) -> Self {
        Self {
            function,
            ..Default::default()
        }
    }
}

impl<'de> Deserialize<'de> for FitConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Full {
            #[serde(rename = "type")]
            function: FitFunction,
            #[serde(default)]
            value: Option<f64>,
            #[serde(default)]
            end_value: Option<EndValue>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Short(FitFunction),
            Full(Full),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Short(function) => FitConfig::new(function),
            Repr::Full(full) => FitConfig {
                function: full.function,
                value: full.value,
                end_value: full.end_value,
            },
        })
    }
}

// =============================================================================
// Naming
// =============================================================================

/// One name-mapping rule
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesNameConfig {
    /// Split accessor (or y accessor) the rule applies to
    pub accessor: String,
    #[serde(default)]
    pub value: Option<ScalarValue>,
    #[serde(default)]
    pub name: Option<String>,
    /// Rules with a lower index are evaluated first; rules without one last
    #[serde(default)]
    pub sort_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SeriesNameConfigOptions {
    #[serde(default)]
    pub names: Option<Vec<SeriesNameConfig>>,
    #[serde(default)]
    pub delimiter: Option<String>,
}

pub type SeriesNameFn = Arc<dyn Fn(&SeriesIdentifier, bool) -> Option<String> + Send + Sync>;

/// How a spec names its series
#[derive(Clone)]
pub enum SeriesName {
    Text(String),
    Options(SeriesNameConfigOptions),
    /// Called with the identifier and whether the name is for a tooltip
    Func(SeriesNameFn),
}

impl fmt::Debug for SeriesName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesName::Text(s) => f.debug_tuple("Text").field(s).finish(),
            SeriesName::Options(o) => f.debug_tuple("Options").field(o).finish(),
            SeriesName::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for SeriesName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Options(SeriesNameConfigOptions),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(s) => SeriesName::Text(s),
            Repr::Options(o) => SeriesName::Options(o),
        })
    }
}

// =============================================================================
// Custom colors
// =============================================================================

pub type SeriesColorFn = Arc<dyn Fn(&SeriesIdentifier) -> Option<String> + Send + Sync>;

/// Per-spec custom series color
#[derive(Clone)]
pub enum SeriesColor {
    /// Same color for every series of the spec
    Fixed(String),
    /// Color by series key
    ByKey(IndexMap<SeriesKey, String>),
    Func(SeriesColorFn),
}

impl SeriesColor {
    pub fn color_for(&self, identifier: &SeriesIdentifier) -> Option<String> {
        match self {
            SeriesColor::Fixed(color) => Some(color.clone()),
            SeriesColor::ByKey(map) => map.get(&identifier.key).cloned(),
            SeriesColor::Func(f) => f(identifier),
        }
    }
}

impl fmt::Debug for SeriesColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesColor::Fixed(c) => f.debug_tuple("Fixed").field(c).finish(),
            SeriesColor::ByKey(m) => f.debug_tuple("ByKey").field(m).finish(),
            SeriesColor::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for SeriesColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Fixed(String),
            ByKey(IndexMap<SeriesKey, String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Fixed(c) => SeriesColor::Fixed(c),
            Repr::ByKey(m) => SeriesColor::ByKey(m),
        })
    }
}

// =============================================================================
// Series spec
// =============================================================================

/// Declarative description of one or more series drawn from one dataset
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesSpec {
    pub id: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default)]
    pub name: Option<SeriesName>,
    pub x_accessor: Accessor,
    pub y_accessors: Vec<Accessor>,
    /// Index-aligned with `y_accessors`
    #[serde(default)]
    pub y0_accessors: Vec<Accessor>,
    #[serde(default)]
    pub split_series_accessors: Vec<Accessor>,
    #[serde(default)]
    pub mark_size_accessor: Option<Accessor>,
    #[serde(default)]
    pub stacked: bool,
    #[serde(default)]
    pub stack_mode: StackMode,
    #[serde(default)]
    pub x_scale_type: ScaleType,
    #[serde(default)]
    pub sort_index: Option<i32>,
    #[serde(default)]
    pub fit: FitConfig,
    #[serde(default)]
    pub color: Option<SeriesColor>,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl SeriesSpec {
    pub fn new(id: impl Into<String>, x_accessor: Accessor, y_accessors: Vec<Accessor>) -> Self {
        Self {
            id: id.into(),
            group_id: default_group_id(),
            name: None,
            x_accessor,
            y_accessors,
            y0_accessors: Vec::new(),
            split_series_accessors: Vec::new(),
            mark_size_accessor: None,
            stacked: false,
            stack_mode: StackMode::None,
            x_scale_type: ScaleType::Linear,
            sort_index: None,
            fit: FitConfig::default(),
            color: None,
            data: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<Value>) -> Self {
        self.data = data;
        self
    }

    pub fn y0_accessor(&self, index: usize) -> Option<&Accessor> {
        self.y0_accessors.get(index)
    }

    pub fn is_banded(&self) -> bool {
        !self.y0_accessors.is_empty()
    }
}

// =============================================================================
// Small multiples
// =============================================================================

pub type PanelFn = Arc<dyn Fn(&SeriesSpec, &Value) -> Option<ScalarValue> + Send + Sync>;

/// Assigns a record to a panel coordinate
#[derive(Clone)]
pub enum PanelAccessor {
    Field(Accessor),
    Func(PanelFn),
}

impl PanelAccessor {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&SeriesSpec, &Value) -> Option<ScalarValue> + Send + Sync + 'static,
    {
        PanelAccessor::Func(Arc::new(f))
    }

    pub fn panel_value(&self, spec: &SeriesSpec, record: &Value) -> Option<ScalarValue> {
        match self {
            PanelAccessor::Field(accessor) => ScalarValue::from_accessor_value(&accessor.get(record)),
            PanelAccessor::Func(f) => f(spec, record),
        }
    }
}

impl fmt::Debug for PanelAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelAccessor::Field(a) => f.debug_tuple("Field").field(a).finish(),
            PanelAccessor::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for PanelAccessor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Accessor::deserialize(deserializer).map(PanelAccessor::Field)
    }
}

/// Small-multiple panel grouping
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupBySpec {
    #[serde(default)]
    pub horizontal: Option<PanelAccessor>,
    #[serde(default)]
    pub vertical: Option<PanelAccessor>,
}

// =============================================================================
// Ordinal ordering
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinAgg {
    None,
    /// Unknown aggregation kinds fall back to sum
    #[default]
    #[serde(other)]
    Sum,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[serde(alias = "asc")]
    Ascending,
    #[default]
    #[serde(alias = "desc")]
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct OrderBy {
    #[serde(default)]
    pub bin_agg: BinAgg,
    #[serde(default)]
    pub direction: Direction,
}

// =============================================================================
// Chart configuration
// =============================================================================

/// Everything one pipeline run consumes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartConfig {
    pub specs: Vec<SeriesSpec>,
    /// Keys of hidden series
    #[serde(default)]
    pub deselected: Vec<SeriesKey>,
    #[serde(default)]
    pub order_ordinal_bins_by: Option<OrderBy>,
    #[serde(default)]
    pub group_by: GroupBySpec,
    #[serde(default)]
    pub palette: ColorPalette,
    /// Chart-level custom colors by series key; spec colors take priority
    #[serde(default)]
    pub custom_colors: IndexMap<SeriesKey, String>,
    #[serde(default)]
    pub overrides: ColorOverrides,
    /// Visit every record for the first y accessor before the next one
    #[serde(default)]
    pub legacy_series_sort: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_spec() {
        let spec: SeriesSpec = serde_json::from_value(json!({
            "id": "s1",
            "x_accessor": "x",
            "y_accessors": ["y"],
        }))
        .unwrap();
        assert_eq!(spec.group_id, DEFAULT_GLOBAL_ID);
        assert_eq!(spec.stack_mode, StackMode::None);
        assert_eq!(spec.x_scale_type, ScaleType::Linear);
        assert_eq!(spec.fit, FitConfig::default());
        assert!(spec.data.is_empty());
        assert!(!spec.is_banded());
    }

    #[test]
    fn test_deserialize_fit_config() {
        let short: FitConfig = serde_json::from_value(json!("carry")).unwrap();
        assert_eq!(short, FitConfig::new(FitFunction::Carry));

        let full: FitConfig = serde_json::from_value(json!({
            "type": "explicit", "value": 3.5, "end_value": "nearest"
        }))
        .unwrap();
        assert_eq!(full.function, FitFunction::Explicit);
        assert_eq!(full.value, Some(3.5));
        assert_eq!(full.end_value, Some(EndValue::Nearest));

        let bad: Result<FitConfig, _> = serde_json::from_value(json!({
            "type": "linear", "end_value": "furthest"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_deserialize_order_by() {
        let order: OrderBy = serde_json::from_value(json!({"bin_agg": "sum", "direction": "asc"})).unwrap();
        assert_eq!(order.bin_agg, BinAgg::Sum);
        assert_eq!(order.direction, Direction::Ascending);

        let unknown: OrderBy = serde_json::from_value(json!({"bin_agg": "median"})).unwrap();
        assert_eq!(unknown.bin_agg, BinAgg::Sum);
        assert_eq!(unknown.direction, Direction::Descending);
    }

    #[test]
    fn test_deserialize_series_name_forms() {
        let text: SeriesName = serde_json::from_value(json!("Revenue")).unwrap();
        assert!(matches!(text, SeriesName::Text(ref s) if s == "Revenue"));

        let options: SeriesName = serde_json::from_value(json!({
            "names": [{"accessor": "g", "value": "a", "name": "Alpha", "sort_index": 1}],
            "delimiter": " / "
        }))
        .unwrap();
        match options {
            SeriesName::Options(o) => {
                assert_eq!(o.delimiter.as_deref(), Some(" / "));
                assert_eq!(o.names.unwrap()[0].value, Some(ScalarValue::text("a")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_panel_field_accessor() {
        let group_by: GroupBySpec = serde_json::from_value(json!({"vertical": "region"})).unwrap();
        let spec = SeriesSpec::new("s", Accessor::path("x").unwrap(), vec![]);
        let panel = group_by.vertical.unwrap();
        assert_eq!(
            panel.panel_value(&spec, &json!({"region": "eu"})),
            Some(ScalarValue::text("eu"))
        );
        assert_eq!(panel.panel_value(&spec, &json!({"region": null})), None);
        assert!(group_by.horizontal.is_none());
    }
}
