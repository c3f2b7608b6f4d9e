//! Dynamic value model for exported component state.
//!
//! Components publish their state as dynamically-shaped values (records of
//! records of primitives). Selector evaluation drills into these values by
//! field path, and the nametable validates traversal suffixes against a
//! component's declared [`Shape`] before any value exists.

use crate::error::{Result, WeftError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Dynamic value for exported state and expression evaluation.
///
/// Wraps `serde_json::Value` to provide path-based field extraction used when
/// evaluating selector expressions against dependency state snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub JsonValue);

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Self(JsonValue::Null)
    }

    /// Create a boolean value.
    pub fn bool(v: bool) -> Self {
        Self(JsonValue::Bool(v))
    }

    /// Create an integer value.
    pub fn int(v: i64) -> Self {
        Self(JsonValue::Number(v.into()))
    }

    /// Create a floating-point value.
    pub fn float(v: f64) -> Self {
        Self(serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    /// Create a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self(JsonValue::String(v.into()))
    }

    /// Create a record value from field pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let map = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.0))
            .collect::<serde_json::Map<String, JsonValue>>();
        Self(JsonValue::Object(map))
    }

    /// Create a sequence value.
    pub fn seq(items: impl IntoIterator<Item = Value>) -> Self {
        Self(JsonValue::Array(items.into_iter().map(|v| v.0).collect()))
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Walk a sequence of field / index steps into this value.
    ///
    /// Each step names a record field; a step that parses as an unsigned
    /// integer indexes into a sequence. Returns `None` if any step is absent.
    pub fn get_path(&self, steps: &[String]) -> Option<Value> {
        let mut current = &self.0;
        for step in steps {
            current = match current {
                JsonValue::Object(map) => map.get(step)?,
                JsonValue::Array(items) => {
                    let idx: usize = step.parse().ok()?;
                    items.get(idx)?
                }
                _ => return None,
            };
        }
        Some(Value(current.clone()))
    }

    /// Convert to a sequence of values, if this is one.
    pub fn as_seq(&self) -> Option<Vec<Value>> {
        match &self.0 {
            JsonValue::Array(items) => Some(items.iter().cloned().map(Value).collect()),
            _ => None,
        }
    }

    /// Render the value for interpolation into a string.
    ///
    /// Strings render bare (no quotes); everything else renders as JSON.
    pub fn display_string(&self) -> String {
        match &self.0 {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Access the inner `serde_json::Value`.
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert into the inner `serde_json::Value`.
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        v.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::bool(v)
    }
}

/// Declared shape of a component's exported state.
///
/// Shapes let the nametable reject a traversal like `foo.bar.nonexistent`
/// during Load, before the component has published any value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Any value; every suffix step is accepted.
    Any,
    /// A boolean.
    Bool,
    /// A number.
    Number,
    /// A string.
    String,
    /// A record with named fields.
    Record(BTreeMap<String, Shape>),
    /// A sequence of uniformly-shaped elements.
    Seq(Box<Shape>),
}

impl Shape {
    /// Build a record shape from field pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Shape)>,
        K: Into<String>,
    {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Validate a traversal suffix against this shape.
    ///
    /// Returns the shape at the end of the path, or an error naming the first
    /// step that does not exist. `Any` absorbs every remaining step.
    pub fn walk(&self, steps: &[String]) -> Result<&Shape> {
        let mut current = self;
        for step in steps {
            current = match current {
                Shape::Any => return Ok(current),
                Shape::Record(fields) => {
                    fields.get(step).ok_or_else(|| WeftError::Resolve {
                        traversal: step.clone(),
                        cause: format!("no field named '{step}'"),
                    })?
                }
                Shape::Seq(elem) => {
                    if step.parse::<usize>().is_err() {
                        return Err(WeftError::Resolve {
                            traversal: step.clone(),
                            cause: format!("'{step}' is not a sequence index"),
                        });
                    }
                    elem
                }
                other => {
                    return Err(WeftError::Resolve {
                        traversal: step.clone(),
                        cause: format!("cannot index into {other:?} with '{step}'"),
                    });
                }
            };
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_walk_into_records() {
        let value = Value(json!({
            "result": {
                "status": "success",
                "data": { "count": 42 }
            }
        }));

        let steps = vec!["result".to_string(), "data".to_string(), "count".to_string()];
        assert_eq!(value.get_path(&steps), Some(Value(json!(42))));

        let missing = vec!["result".to_string(), "missing".to_string()];
        assert!(value.get_path(&missing).is_none());
    }

    #[test]
    fn path_walk_indexes_sequences() {
        let value = Value(json!({ "items": [{"name": "first"}, {"name": "second"}] }));
        let steps = vec!["items".to_string(), "1".to_string(), "name".to_string()];
        assert_eq!(value.get_path(&steps), Some(Value(json!("second"))));
    }

    #[test]
    fn display_string_is_bare_for_strings() {
        assert_eq!(Value::string("hi").display_string(), "hi");
        assert_eq!(Value::int(3).display_string(), "3");
        assert_eq!(
            Value(json!({"a": 1})).display_string(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn record_constructor() {
        let v = Value::record([("out", Value::int(1))]);
        assert_eq!(v, Value(json!({"out": 1})));
    }

    #[test]
    fn shape_walk_accepts_known_fields() {
        let shape = Shape::record([(
            "out",
            Shape::record([("count", Shape::Number)]),
        )]);

        let ok = vec!["out".to_string(), "count".to_string()];
        assert_eq!(shape.walk(&ok).unwrap(), &Shape::Number);
    }

    #[test]
    fn shape_walk_rejects_unknown_fields() {
        let shape = Shape::record([("out", Shape::Any)]);
        let bad = vec!["nonexistent".to_string()];
        assert!(matches!(shape.walk(&bad), Err(WeftError::Resolve { .. })));
    }

    #[test]
    fn shape_any_absorbs_remaining_steps() {
        let shape = Shape::record([("out", Shape::Any)]);
        let deep = vec!["out".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(shape.walk(&deep).unwrap(), &Shape::Any);
    }

    #[test]
    fn shape_seq_requires_numeric_steps() {
        let shape = Shape::Seq(Box::new(Shape::String));
        assert!(shape.walk(&["0".to_string()]).is_ok());
        assert!(shape.walk(&["name".to_string()]).is_err());
    }
}
