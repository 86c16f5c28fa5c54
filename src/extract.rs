// Value extraction and numeric coercion

use crate::accessor::{Accessor, AccessorValue};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Raw values that could not be coerced to numbers while processing one spec
#[derive(Debug, Clone, Default)]
pub struct NonNumericValues {
    values: Vec<Value>,
}

impl NonNumericValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: Value) {
        self.values.push(raw);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct offenders in first-seen order
    pub fn distinct(&self) -> Vec<Value> {
        let mut out: Vec<Value> = Vec::new();
        for value in &self.values {
            if !out.contains(value) {
                out.push(value.clone());
            }
        }
        out
    }

    /// Emit the single consolidated warning for a spec, if anything was offending
    pub fn warn_if_any(&self, spec_id: &str) -> Option<CoercionWarning> {
        if self.is_empty() {
            return None;
        }
        let warning = CoercionWarning {
            spec_id: spec_id.to_string(),
            values: self.distinct(),
        };
        tracing::warn!(
            spec_id = %warning.spec_id,
            values = %warning.joined_values(),
            "{}",
            warning
        );
        Some(warning)
    }
}

/// Non-fatal report of non-numeric y/y0/mark values found in a spec's dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionWarning {
    pub spec_id: String,
    pub values: Vec<Value>,
}

impl CoercionWarning {
    fn joined_values(&self) -> String {
        self.values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found non-numeric y/y0/mark value{} in dataset for spec \"{}\" ({})",
            if self.values.len() > 1 { "s" } else { "" },
            self.spec_id,
            self.joined_values()
        )
    }
}

/// Parse a string the way a JS `Number(..)` call would
fn parse_js_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    // Rust also accepts "inf" and "nan", which are not numbers here
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Coerce an accessor value to a number.
///
/// Null and missing values become `None` silently. Anything else that does
/// not convert is recorded in `offenders` and also becomes `None`.
pub fn cast_to_number(value: &AccessorValue, offenders: &mut NonNumericValues) -> Option<f64> {
    let converted = match value {
        AccessorValue::Null => return None,
        AccessorValue::Number(v) => Some(*v),
        AccessorValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        AccessorValue::Text(s) => parse_js_number(s),
        AccessorValue::Other(_) => None,
    };
    match converted {
        Some(v) if !v.is_nan() => Some(v),
        _ => {
            offenders.push(value.to_json());
            None
        }
    }
}

/// Values read from one record for one y accessor
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedValues<'a> {
    pub y1: Option<f64>,
    pub y0: Option<f64>,
    pub mark: Option<f64>,
    pub initial_y1: Option<f64>,
    pub initial_y0: Option<f64>,
    pub datum: &'a Value,
}

/// Read y1, y0 and the mark size from a record. Never fails.
pub fn extract_y_and_mark<'a>(
    datum: &'a Value,
    y_accessor: &Accessor,
    offenders: &mut NonNumericValues,
    y0_accessor: Option<&Accessor>,
    mark_size_accessor: Option<&Accessor>,
) -> ExtractedValues<'a> {
    let mark = mark_size_accessor.and_then(|accessor| cast_to_number(&accessor.get(datum), offenders));
    let y1 = cast_to_number(&y_accessor.get(datum), offenders);
    let y0 = y0_accessor.and_then(|accessor| cast_to_number(&accessor.get(datum), offenders));

    ExtractedValues {
        y1,
        y0,
        mark,
        initial_y1: y1,
        initial_y0: y0,
        datum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cast(value: Value) -> (Option<f64>, NonNumericValues) {
        let mut offenders = NonNumericValues::new();
        let v = cast_to_number(&AccessorValue::from_json(&value), &mut offenders);
        (v, offenders)
    }

    #[test]
    fn test_cast_numbers_and_numeric_strings() {
        assert_eq!(cast(json!(5)).0, Some(5.0));
        assert_eq!(cast(json!("2.5")).0, Some(2.5));
        assert_eq!(cast(json!(" 7 ")).0, Some(7.0));
        assert_eq!(cast(json!("")).0, Some(0.0));
        assert_eq!(cast(json!(true)).0, Some(1.0));
        assert_eq!(cast(json!("0x10")).0, Some(16.0));
        assert_eq!(cast(json!("-Infinity")).0, Some(f64::NEG_INFINITY));
        assert_eq!(cast(json!("1e3")).0, Some(1000.0));
    }

    #[test]
    fn test_cast_null_is_silent() {
        let (v, offenders) = cast(Value::Null);
        assert_eq!(v, None);
        assert!(offenders.is_empty());
    }

    #[test]
    fn test_cast_records_offenders() {
        let mut offenders = NonNumericValues::new();
        for raw in [json!("bad"), json!("nan"), json!({"a": 1}), json!("bad")] {
            let v = cast_to_number(&AccessorValue::from_json(&raw), &mut offenders);
            assert_eq!(v, None);
        }
        assert_eq!(offenders.len(), 4);
        assert_eq!(offenders.distinct(), vec![json!("bad"), json!("nan"), json!({"a": 1})]);
    }

    #[test]
    fn test_extract_keeps_initial_values() {
        let record = json!({"y": "3", "y0": 1, "size": "big"});
        let mut offenders = NonNumericValues::new();
        let y = Accessor::path("y").unwrap();
        let y0 = Accessor::path("y0").unwrap();
        let size = Accessor::path("size").unwrap();
        let out = extract_y_and_mark(&record, &y, &mut offenders, Some(&y0), Some(&size));

        assert_eq!(out.y1, Some(3.0));
        assert_eq!(out.initial_y1, Some(3.0));
        assert_eq!(out.y0, Some(1.0));
        assert_eq!(out.initial_y0, Some(1.0));
        assert_eq!(out.mark, None);
        assert_eq!(offenders.distinct(), vec![json!("big")]);
        assert!(std::ptr::eq(out.datum, &record));
    }

    #[test]
    fn test_warning_lists_distinct_values() {
        let mut offenders = NonNumericValues::new();
        assert!(offenders.warn_if_any("s1").is_none());

        offenders.push(json!("bad"));
        offenders.push(json!("bad"));
        let warning = offenders.warn_if_any("s1").unwrap();
        assert_eq!(warning.values, vec![json!("bad")]);
        assert_eq!(
            warning.to_string(),
            "Found non-numeric y/y0/mark value in dataset for spec \"s1\" (\"bad\")"
        );
    }
}
