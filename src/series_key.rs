// Canonical series keys
//
// Every field is rendered inside its own `name{...}` segment and the
// characters that delimit segments, pairs and number markers are escaped, so
// no value can be read as a delimiter of another field.

use crate::ir::{ScalarValue, SeriesIdentifier, SeriesKey};

fn escape_into(out: &mut String, s: &str, escape_dash: bool) {
    for c in s.chars() {
        if matches!(c, '\\' | '{' | '}' | '|' | '#') || (escape_dash && c == '-') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(&mut out, s, false);
    out
}

/// Numbers carry a `#` marker so `1` and `"1"` never share a key
fn escape_scalar(value: &ScalarValue) -> String {
    match value {
        // -0 and 0 are the same value
        ScalarValue::Number(v) if v.0 == 0.0 => "#0".to_string(),
        ScalarValue::Number(_) => format!("#{}", value),
        ScalarValue::Text(s) => escape(s),
    }
}

/// Build the canonical key of a series.
///
/// Split accessors are sorted by accessor name so the key does not depend on
/// the order in which they were configured. Panel markers are only emitted
/// when a panel value is present. Data values never enter the key.
pub fn get_series_key(identifier: &SeriesIdentifier, group_id: &str) -> SeriesKey {
    let mut split: Vec<_> = identifier.split_accessors.iter().collect();
    split.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut joined = String::new();
    for (i, (accessor, value)) in split.into_iter().enumerate() {
        if i > 0 {
            joined.push('|');
        }
        escape_into(&mut joined, accessor, true);
        joined.push('-');
        joined.push_str(&escape_scalar(value));
    }

    let sm_v = identifier
        .sm_v_accessor_value
        .as_ref()
        .map(|v| format!("smV{{{}}}", escape_scalar(v)))
        .unwrap_or_default();
    let sm_h = identifier
        .sm_h_accessor_value
        .as_ref()
        .map(|v| format!("smH{{{}}}", escape_scalar(v)))
        .unwrap_or_default();

    format!(
        "groupId{{{}}}spec{{{}}}yAccessor{{{}}}splitAccessors{{{}}}{}{}",
        escape(group_id),
        escape(&identifier.spec_id),
        escape(&identifier.y_accessor),
        joined,
        sm_v,
        sm_h,
    )
}
