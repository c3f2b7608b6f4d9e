//! Block definitions from the configuration document.

use crate::error::{Result, WeftError};
use crate::eval::{self, EvalContext};
use crate::expr::{self, Traversal};
use crate::reference::Reference;
use serde::{Deserialize, Serialize};

/// The decoded configuration unit for one component.
///
/// A block carries a kind tag, zero or more labels, and an opaque body of
/// attributes and nested blocks. Bodies expose two operations only:
/// enumerate attribute expressions, and enumerate child blocks.
///
/// # Example
///
/// ```yaml
/// components:
///   - kind: relay
///     labels: [echo]
///     body:
///       input: ${constant.greeting.out}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDefinition {
    /// Component kind (possibly dotted, e.g. "remote.http").
    pub kind: String,

    /// Instance labels.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Attributes and nested blocks, unevaluated.
    #[serde(default)]
    pub body: serde_yaml::Value,
}

impl BlockDefinition {
    /// Create a new block definition with an empty body.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            labels: Vec::new(),
            body: serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        }
    }

    /// Add a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: serde_yaml::Value) -> Self {
        self.body = body;
        self
    }

    /// The reference this block registers under.
    pub fn reference(&self) -> Reference {
        Reference::from_block(&self.kind, &self.labels)
    }

    /// Enumerate attribute expressions: body entries that are not mappings.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &serde_yaml::Value)> {
        self.body_entries()
            .filter(|(_, v)| !matches!(v, serde_yaml::Value::Mapping(_)))
    }

    /// Enumerate child blocks: body entries that are mappings.
    pub fn child_blocks(&self) -> impl Iterator<Item = (&str, &serde_yaml::Value)> {
        self.body_entries()
            .filter(|(_, v)| matches!(v, serde_yaml::Value::Mapping(_)))
    }

    fn body_entries(&self) -> impl Iterator<Item = (&str, &serde_yaml::Value)> {
        match &self.body {
            serde_yaml::Value::Mapping(map) => Some(map.iter()),
            _ => None,
        }
        .into_iter()
        .flatten()
        .filter_map(|(k, v)| k.as_str().map(|k| (k, v)))
    }

    /// Collect every traversal referenced anywhere in the body, depth-first.
    pub fn traversals(&self) -> Result<Vec<Traversal>> {
        expr::collect_traversals(&self.body)
    }

    /// Evaluate the body against a context and deserialize into a typed config.
    pub fn decode<T: serde::de::DeserializeOwned>(&self, ectx: Option<&EvalContext>) -> Result<T> {
        let evaluated = eval::evaluate(&self.body, ectx)?;
        serde_json::from_value(evaluated.into_inner()).map_err(|e| WeftError::Decode {
            location: self.reference().to_string(),
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    fn block(yaml: &str) -> BlockDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn deserialize_block() {
        let b = block(
            r#"
kind: relay
labels: [echo]
body:
  input: ${constant.greeting.out}
"#,
        );
        assert_eq!(b.kind, "relay");
        assert_eq!(b.reference().to_string(), "relay.echo");
    }

    #[test]
    fn attributes_and_child_blocks_partition_the_body() {
        let b = block(
            r#"
kind: sink
labels: [k]
body:
  input: ${filter.f.out}
  buffer:
    size: 10
"#,
        );
        let attrs: Vec<&str> = b.attributes().map(|(k, _)| k).collect();
        let children: Vec<&str> = b.child_blocks().map(|(k, _)| k).collect();
        assert_eq!(attrs, vec!["input"]);
        assert_eq!(children, vec!["buffer"]);
    }

    #[test]
    fn traversals_cover_nested_blocks() {
        let b = block(
            r#"
kind: sink
labels: [k]
body:
  input: ${filter.f.out}
  buffer:
    limit: ${filter.f.out}
"#,
        );
        assert_eq!(b.traversals().unwrap().len(), 2);
    }

    #[test]
    fn decode_evaluates_then_deserializes() {
        #[derive(serde::Deserialize)]
        struct Config {
            input: String,
            level: i64,
        }

        let b = block(
            r#"
kind: relay
labels: [echo]
body:
  input: ${constant.greeting.out}
  level: 3
"#,
        );

        let mut ectx = EvalContext::new();
        ectx.bind("constant.greeting", Value(json!({"out": "hello"})));

        let config: Config = b.decode(Some(&ectx)).unwrap();
        assert_eq!(config.input, "hello");
        assert_eq!(config.level, 3);
    }

    #[test]
    fn decode_reports_schema_mismatch() {
        #[derive(serde::Deserialize)]
        struct Config {
            #[allow(dead_code)]
            interval_ms: u64,
        }

        let b = block("kind: ticker\nlabels: [t]\nbody:\n  interval_ms: not-a-number");
        let result: Result<Config> = b.decode(None);
        assert!(matches!(result, Err(WeftError::Decode { .. })));
    }

    #[test]
    fn builder_constructors() {
        let b = BlockDefinition::new("constant").with_label("greeting");
        assert_eq!(b.reference().to_string(), "constant.greeting");
        assert_eq!(b.attributes().count(), 0);
    }
}
