//! Evaluation contexts for selector expressions.
//!
//! An [`EvalContext`] binds each dependency's reference string to a snapshot
//! of that dependency's exported state, taken at context-build time. Contexts
//! never hold live references into the graph; re-evaluation always builds a
//! fresh context from current state.

use crate::error::{Result, WeftError};
use crate::expr::{Scalar, Segment, Selector, SelectorParser, Traversal};
use crate::value::Value;
use std::collections::BTreeMap;

/// A built-in function available inside selector expressions.
pub type BuiltinFn = fn(&[Value]) -> Result<Value>;

/// Evaluation environment for one (re)evaluation of a component's block.
///
/// Bindings map a dependency's full reference string (e.g. `constant.greeting`)
/// to the value it exported when the context was built. The function table is
/// fixed at runtime; [`EvalContext::install_builtins`] injects it.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    bindings: BTreeMap<String, Value>,
    functions: BTreeMap<&'static str, BuiltinFn>,
}

impl EvalContext {
    /// Create an empty context with no bindings and no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a reference string to a state snapshot.
    pub fn bind(&mut self, reference: impl Into<String>, value: Value) {
        self.bindings.insert(reference.into(), value);
    }

    /// Install the fixed built-in function table.
    pub fn install_builtins(&mut self) {
        self.functions.insert("concat", builtin_concat);
    }

    /// Number of bound references.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the context has no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve a traversal against the bindings.
    ///
    /// Matches the longest bound prefix of the traversal, then walks the
    /// remaining steps into the bound value.
    pub fn resolve(&self, traversal: &Traversal) -> Result<Value> {
        for split in (1..=traversal.parts.len()).rev() {
            let prefix = traversal.parts[..split].join(".");
            if let Some(value) = self.bindings.get(&prefix) {
                let suffix = &traversal.parts[split..];
                return value.get_path(suffix).ok_or_else(|| WeftError::Eval {
                    selector: traversal.to_string(),
                    cause: format!("'{prefix}' has no field '{}'", suffix.join(".")),
                });
            }
        }
        Err(WeftError::Eval {
            selector: traversal.to_string(),
            cause: "reference is not bound in this context".to_string(),
        })
    }

    /// Evaluate a parsed selector.
    pub fn evaluate_selector(&self, selector: &Selector) -> Result<Value> {
        match selector {
            Selector::Traversal(t) => self.resolve(t),
            Selector::Call { name, args } => {
                let func = self.functions.get(name.as_str()).ok_or_else(|| {
                    WeftError::Eval {
                        selector: selector.raw(),
                        cause: format!("unknown function '{name}'"),
                    }
                })?;
                let values = args
                    .iter()
                    .map(|t| self.resolve(t))
                    .collect::<Result<Vec<_>>>()?;
                func(&values)
            }
        }
    }
}

/// `concat(seq, seq, ...) -> seq`
fn builtin_concat(args: &[Value]) -> Result<Value> {
    let mut out = Vec::new();
    for arg in args {
        let items = arg.as_seq().ok_or_else(|| WeftError::Eval {
            selector: "concat".to_string(),
            cause: format!("argument is not a sequence: {arg}"),
        })?;
        out.extend(items);
    }
    Ok(Value::seq(out))
}

/// Evaluate a YAML body value into a dynamic [`Value`].
///
/// Strings are scanned for selectors: a scalar that is exactly one selector
/// substitutes the referenced value unchanged; mixed text interpolates string
/// renderings. Sequences and mappings evaluate element-wise. A `None` context
/// means the expression has no free variables; any selector then fails.
pub fn evaluate(value: &serde_yaml::Value, ectx: Option<&EvalContext>) -> Result<Value> {
    match value {
        serde_yaml::Value::Null => Ok(Value::null()),
        serde_yaml::Value::Bool(b) => Ok(Value::bool(*b)),
        serde_yaml::Value::Number(n) => {
            let json: serde_json::Number =
                serde_json::from_str(&n.to_string()).map_err(|e| WeftError::Eval {
                    selector: n.to_string(),
                    cause: e.to_string(),
                })?;
            Ok(Value(serde_json::Value::Number(json)))
        }
        serde_yaml::Value::String(s) => evaluate_scalar(s, ectx),
        serde_yaml::Value::Sequence(items) => {
            let out = items
                .iter()
                .map(|item| evaluate(item, ectx))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::seq(out))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let key = k.as_str().ok_or_else(|| WeftError::Eval {
                    selector: format!("{k:?}"),
                    cause: "mapping keys must be strings".to_string(),
                })?;
                out.insert(key.to_string(), evaluate(v, ectx)?.into_inner());
            }
            Ok(Value(serde_json::Value::Object(out)))
        }
        serde_yaml::Value::Tagged(tagged) => evaluate(&tagged.value, ectx),
    }
}

fn evaluate_scalar(s: &str, ectx: Option<&EvalContext>) -> Result<Value> {
    match SelectorParser::parse_scalar(s)? {
        Scalar::Literal(text) => Ok(Value::string(text)),
        Scalar::Single(selector) => require_context(&selector, ectx)?.evaluate_selector(&selector),
        Scalar::Template(segments) => {
            let mut out = String::new();
            for segment in &segments {
                match segment {
                    Segment::Text(text) => out.push_str(text),
                    Segment::Selector(selector) => {
                        let value =
                            require_context(selector, ectx)?.evaluate_selector(selector)?;
                        out.push_str(&value.display_string());
                    }
                }
            }
            Ok(Value::string(out))
        }
    }
}

fn require_context<'a>(
    selector: &Selector,
    ectx: Option<&'a EvalContext>,
) -> Result<&'a EvalContext> {
    ectx.ok_or_else(|| WeftError::Eval {
        selector: selector.raw(),
        cause: "expression has no dependencies to reference".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> EvalContext {
        let mut ectx = EvalContext::new();
        ectx.bind(
            "constant.greeting",
            Value(json!({"out": "hello"})),
        );
        ectx.bind("feed.a", Value(json!({"out": [1, 2]})));
        ectx.bind("feed.b", Value(json!({"out": [3]})));
        ectx.install_builtins();
        ectx
    }

    fn eval_str(s: &str, ectx: &EvalContext) -> Result<Value> {
        evaluate(&serde_yaml::Value::String(s.to_string()), Some(ectx))
    }

    #[test]
    fn whole_selector_substitutes_value() {
        let v = eval_str("${constant.greeting.out}", &context()).unwrap();
        assert_eq!(v, Value(json!("hello")));
    }

    #[test]
    fn template_interpolates_strings() {
        let v = eval_str("say ${constant.greeting.out}!", &context()).unwrap();
        assert_eq!(v, Value(json!("say hello!")));
    }

    #[test]
    fn longest_prefix_wins() {
        let mut ectx = context();
        // A binding for the bare root must not shadow the longer prefix.
        ectx.bind("constant", Value(json!({"greeting": {"out": "wrong"}})));
        let v = eval_str("${constant.greeting.out}", &ectx).unwrap();
        assert_eq!(v, Value(json!("hello")));
    }

    #[test]
    fn concat_joins_sequences() {
        let v = eval_str("${concat(feed.a.out, feed.b.out)}", &context()).unwrap();
        assert_eq!(v, Value(json!([1, 2, 3])));
    }

    #[test]
    fn concat_rejects_non_sequences() {
        let result = eval_str("${concat(constant.greeting.out)}", &context());
        assert!(matches!(result, Err(WeftError::Eval { .. })));
    }

    #[test]
    fn unknown_function_is_an_error() {
        let result = eval_str("${upper(constant.greeting.out)}", &context());
        assert!(matches!(result, Err(WeftError::Eval { .. })));
    }

    #[test]
    fn unbound_reference_is_an_eval_error() {
        let result = eval_str("${nobody.home.out}", &context());
        assert!(matches!(result, Err(WeftError::Eval { .. })));
    }

    #[test]
    fn selector_without_context_is_an_error() {
        let value = serde_yaml::Value::String("${a.b.out}".to_string());
        assert!(evaluate(&value, None).is_err());
    }

    #[test]
    fn plain_values_pass_through() {
        let body: serde_yaml::Value =
            serde_yaml::from_str("value: 42\nnested:\n  flag: true").unwrap();
        let v = evaluate(&body, None).unwrap();
        assert_eq!(v, Value(json!({"value": 42, "nested": {"flag": true}})));
    }

    #[test]
    fn missing_field_on_bound_value() {
        let result = eval_str("${constant.greeting.nope}", &context());
        assert!(matches!(result, Err(WeftError::Eval { .. })));
    }
}
