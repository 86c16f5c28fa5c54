// Accessors: rules that pull one field out of a raw record

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{map, map_res},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Errors raised while parsing an accessor path
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessorError {
    #[error("accessor path is empty")]
    Empty,

    #[error("invalid accessor path '{path}': unexpected input at '{rest}'")]
    Invalid { path: String, rest: String },
}

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed field path such as `price`, `stats.total` or `points[2].y`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorPath {
    raw: String,
    segments: Vec<PathSegment>,
}

fn key_segment(input: &str) -> IResult<&str, PathSegment> {
    map(
        take_while1(|c: char| c != '.' && c != '[' && c != ']'),
        |s: &str| PathSegment::Key(s.to_string()),
    )(input)
}

fn index_segment(input: &str) -> IResult<&str, PathSegment> {
    map(
        delimited(
            char('['),
            map_res(digit1, |s: &str| s.parse::<usize>()),
            char(']'),
        ),
        PathSegment::Index,
    )(input)
}

/// Parse a path
/// Format: segment ( '.' key | '[' index ']' )*
fn path_segments(input: &str) -> IResult<&str, Vec<PathSegment>> {
    let (input, first) = alt((index_segment, key_segment))(input)?;
    let (input, rest) = many0(alt((preceded(char('.'), key_segment), index_segment)))(input)?;

    let mut segments = Vec::with_capacity(rest.len() + 1);
    segments.push(first);
    segments.extend(rest);
    Ok((input, segments))
}

impl AccessorPath {
    pub fn parse(raw: &str) -> Result<Self, AccessorError> {
        if raw.is_empty() {
            return Err(AccessorError::Empty);
        }
        match path_segments(raw) {
            Ok(("", segments)) => Ok(Self {
                raw: raw.to_string(),
                segments,
            }),
            Ok((rest, _)) => Err(AccessorError::Invalid {
                path: raw.to_string(),
                rest: rest.to_string(),
            }),
            Err(_) => Err(AccessorError::Invalid {
                path: raw.to_string(),
                rest: raw.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Look the path up in a record.
    ///
    /// A literal key equal to the whole path wins over the nested walk, so a
    /// column literally called `a.b` is still reachable.
    pub fn lookup<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        if let Some(found) = record.as_object().and_then(|obj| obj.get(&self.raw)) {
            return Some(found);
        }
        if self.segments.len() == 1 && matches!(self.segments[0], PathSegment::Key(_)) {
            return None;
        }

        let mut current = record;
        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(obj)) => obj.get(key)?,
                (PathSegment::Index(idx), Value::Array(items)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// A user supplied getter
pub type AccessorFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// A rule extracting one field's value from a raw record.
///
/// Field paths and array indices come from configuration; functions are only
/// available through the Rust API and must carry a name, because the name is
/// what enters a series identifier.
#[derive(Clone)]
pub enum Accessor {
    Path(AccessorPath),
    Index(usize),
    Func { name: String, f: AccessorFn },
}

impl Accessor {
    pub fn path(raw: &str) -> Result<Self, AccessorError> {
        AccessorPath::parse(raw).map(Accessor::Path)
    }

    pub fn func<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Accessor::Func {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// Display name used in series identifiers
    pub fn name(&self) -> String {
        match self {
            Accessor::Path(path) => path.as_str().to_string(),
            Accessor::Index(idx) => idx.to_string(),
            Accessor::Func { name, .. } => name.clone(),
        }
    }

    /// Read the accessor's value from a record
    pub fn get(&self, record: &Value) -> AccessorValue {
        match self {
            Accessor::Path(path) => path
                .lookup(record)
                .map(AccessorValue::from_json)
                .unwrap_or(AccessorValue::Null),
            Accessor::Index(idx) => match record {
                Value::Array(items) => items
                    .get(*idx)
                    .map(AccessorValue::from_json)
                    .unwrap_or(AccessorValue::Null),
                Value::Object(obj) => obj
                    .get(&idx.to_string())
                    .map(AccessorValue::from_json)
                    .unwrap_or(AccessorValue::Null),
                _ => AccessorValue::Null,
            },
            Accessor::Func { f, .. } => f(record)
                .as_ref()
                .map(AccessorValue::from_json)
                .unwrap_or(AccessorValue::Null),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Path(path) => f.debug_tuple("Path").field(&path.as_str()).finish(),
            Accessor::Index(idx) => f.debug_tuple("Index").field(idx).finish(),
            Accessor::Func { name, .. } => f.debug_struct("Func").field("name", name).finish_non_exhaustive(),
        }
    }
}

impl<'de> Deserialize<'de> for Accessor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Index(usize),
            Path(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Index(idx) => Ok(Accessor::Index(idx)),
            Repr::Path(raw) => Accessor::path(&raw).map_err(serde::de::Error::custom),
        }
    }
}

/// A value read by an accessor, validated at the extraction boundary
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Other(Value),
}

impl AccessorValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => AccessorValue::Null,
            Value::Bool(b) => AccessorValue::Bool(*b),
            Value::Number(n) => match n.as_f64() {
                Some(v) => AccessorValue::Number(v),
                None => AccessorValue::Other(value.clone()),
            },
            Value::String(s) => AccessorValue::Text(s.clone()),
            other => AccessorValue::Other(other.clone()),
        }
    }

    /// The raw value as it appeared in the record
    pub fn to_json(&self) -> Value {
        match self {
            AccessorValue::Null => Value::Null,
            AccessorValue::Bool(b) => Value::Bool(*b),
            AccessorValue::Number(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            AccessorValue::Text(s) => Value::String(s.clone()),
            AccessorValue::Other(v) => v.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_key() {
        let path = AccessorPath::parse("price").unwrap();
        assert_eq!(path.segments(), &[PathSegment::Key("price".to_string())]);
    }

    #[test]
    fn test_parse_nested_path() {
        let path = AccessorPath::parse("points[2].y").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("points".to_string()),
                PathSegment::Index(2),
                PathSegment::Key("y".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_invalid_paths() {
        assert_eq!(AccessorPath::parse(""), Err(AccessorError::Empty));
        assert!(AccessorPath::parse("a..b").is_err());
        assert!(AccessorPath::parse("a[x]").is_err());
        assert!(AccessorPath::parse("a[1").is_err());
    }

    #[test]
    fn test_lookup_prefers_literal_key() {
        let record = json!({"a.b": 1, "a": {"b": 2}});
        let accessor = Accessor::path("a.b").unwrap();
        assert_eq!(accessor.get(&record), AccessorValue::Number(1.0));

        let record = json!({"a": {"b": 2}});
        assert_eq!(accessor.get(&record), AccessorValue::Number(2.0));
    }

    #[test]
    fn test_index_accessor_on_arrays() {
        let record = json!([10, "x", null]);
        assert_eq!(Accessor::Index(0).get(&record), AccessorValue::Number(10.0));
        assert_eq!(Accessor::Index(1).get(&record), AccessorValue::Text("x".to_string()));
        assert_eq!(Accessor::Index(2).get(&record), AccessorValue::Null);
        assert_eq!(Accessor::Index(5).get(&record), AccessorValue::Null);
    }

    #[test]
    fn test_function_accessor() {
        let accessor = Accessor::func("double", |r| {
            r.get("v").and_then(Value::as_f64).map(|v| json!(v * 2.0))
        });
        assert_eq!(accessor.name(), "double");
        assert_eq!(accessor.get(&json!({"v": 2})), AccessorValue::Number(4.0));
        assert_eq!(accessor.get(&json!({})), AccessorValue::Null);
    }

    #[test]
    fn test_deserialize_accessor() {
        let accessors: Vec<Accessor> = serde_json::from_value(json!(["y", 3, "a.b"])).unwrap();
        assert_eq!(accessors[0].name(), "y");
        assert!(matches!(accessors[1], Accessor::Index(3)));
        assert_eq!(accessors[2].name(), "a.b");

        let bad: Result<Accessor, _> = serde_json::from_value(json!("a[x]"));
        assert!(bad.is_err());
    }
}
