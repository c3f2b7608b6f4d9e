//! Selector expressions and traversals.
//!
//! Configuration attributes reference other components' exported state with
//! selector expressions embedded in YAML scalars:
//!
//! ```yaml
//! input: ${constant.greeting.out}
//! inputs: ${concat(feed.a.out, feed.b.out)}
//! message: "got ${constant.greeting.out} from upstream"
//! ```
//!
//! A [`Traversal`] is the dotted path inside a selector; extraction walks a
//! block body depth-first (attributes, then nested blocks) and collects every
//! traversal so the loader can wire dependency edges before anything is
//! evaluated.

use crate::error::{Result, WeftError};

/// A dotted path appearing inside a selector expression.
///
/// Represents a read of some component's exported state, optionally drilling
/// into a sub-field: the nametable matches the longest prefix to a registered
/// component and validates the remainder against its state shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    /// The parts of the path, in order.
    pub parts: Vec<String>,
}

impl Traversal {
    /// Create a traversal from its parts.
    pub fn new(parts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Traversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

/// A parsed selector expression (the content of one `${...}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A plain traversal: `${a.b.c}`.
    Traversal(Traversal),
    /// A built-in function applied to traversals: `${concat(a.b, c.d)}`.
    Call {
        /// The function name.
        name: String,
        /// The traversal arguments.
        args: Vec<Traversal>,
    },
}

impl Selector {
    /// All traversals read by this selector.
    pub fn traversals(&self) -> Vec<&Traversal> {
        match self {
            Self::Traversal(t) => vec![t],
            Self::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Render the selector back to its `${...}` source form.
    pub fn raw(&self) -> String {
        match self {
            Self::Traversal(t) => format!("${{{t}}}"),
            Self::Call { name, args } => {
                let args = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("${{{name}({args})}}")
            }
        }
    }
}

/// One piece of a scanned scalar: literal text or a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text between selectors.
    Text(String),
    /// A selector expression.
    Selector(Selector),
}

/// Classification of a scalar after scanning for selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// No selectors; the string is used verbatim.
    Literal(String),
    /// The entire scalar is exactly one selector; evaluation substitutes the
    /// referenced value without stringifying it.
    Single(Selector),
    /// A mix of text and selectors; evaluation interpolates string renderings.
    Template(Vec<Segment>),
}

/// Parser for selector expressions.
pub struct SelectorParser;

impl SelectorParser {
    /// Scan a scalar and classify it as literal, single selector, or template.
    pub fn parse_scalar(input: &str) -> Result<Scalar> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut expr = String::new();
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == '}' {
                        closed = true;
                        break;
                    }
                    expr.push(ch);
                }
                if !closed {
                    return Err(WeftError::Selector {
                        selector: format!("${{{expr}"),
                        cause: "unclosed selector expression".to_string(),
                    });
                }

                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Selector(Self::parse_expression(&expr)?));
            } else {
                text.push(ch);
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        match segments.as_slice() {
            [] => Ok(Scalar::Literal(String::new())),
            [Segment::Text(t)] => Ok(Scalar::Literal(t.clone())),
            [Segment::Selector(s)] => Ok(Scalar::Single(s.clone())),
            _ => Ok(Scalar::Template(segments)),
        }
    }

    /// Parse a single selector expression (without the `${}` wrapper).
    pub fn parse_expression(expr: &str) -> Result<Selector> {
        let expr = expr.trim();

        if expr.is_empty() {
            return Err(WeftError::Selector {
                selector: String::new(),
                cause: "empty selector expression".to_string(),
            });
        }

        if let Some(open) = expr.find('(') {
            let name = expr[..open].trim();
            if !Self::is_valid_identifier(name) {
                return Err(WeftError::Selector {
                    selector: expr.to_string(),
                    cause: format!("invalid function name: {name}"),
                });
            }
            let Some(inner) = expr[open + 1..].strip_suffix(')') else {
                return Err(WeftError::Selector {
                    selector: expr.to_string(),
                    cause: "missing ')' in function application".to_string(),
                });
            };
            let mut args = Vec::new();
            for arg in inner.split(',') {
                let arg = arg.trim();
                if arg.is_empty() {
                    continue;
                }
                args.push(Self::parse_traversal(arg)?);
            }
            return Ok(Selector::Call {
                name: name.to_string(),
                args,
            });
        }

        Ok(Selector::Traversal(Self::parse_traversal(expr)?))
    }

    /// Parse a dotted traversal path.
    pub fn parse_traversal(expr: &str) -> Result<Traversal> {
        let parts: Vec<&str> = expr.split('.').collect();

        for (i, part) in parts.iter().enumerate() {
            // Later steps may be numeric sequence indexes; the root may not.
            let numeric = i > 0 && part.chars().all(|c| c.is_ascii_digit()) && !part.is_empty();
            if !numeric && !Self::is_valid_identifier(part) {
                return Err(WeftError::Selector {
                    selector: expr.to_string(),
                    cause: format!("invalid identifier: {part}"),
                });
            }
        }

        Ok(Traversal::new(parts))
    }

    /// Check if a string is a valid identifier.
    fn is_valid_identifier(s: &str) -> bool {
        let mut chars = s.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !first.is_ascii_alphabetic() && first != '_' {
            return false;
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

/// Recursively collect every traversal referenced by a YAML value.
///
/// The scan is depth-first in document order over attributes and nested
/// blocks. Duplicates are preserved; they collapse later at edge insertion.
pub fn collect_traversals(value: &serde_yaml::Value) -> Result<Vec<Traversal>> {
    let mut out = Vec::new();
    collect_into(value, &mut out)?;
    Ok(out)
}

fn collect_into(value: &serde_yaml::Value, out: &mut Vec<Traversal>) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => match SelectorParser::parse_scalar(s)? {
            Scalar::Literal(_) => {}
            Scalar::Single(sel) => out.extend(sel.traversals().into_iter().cloned()),
            Scalar::Template(segments) => {
                for segment in segments {
                    if let Segment::Selector(sel) = segment {
                        out.extend(sel.traversals().into_iter().cloned());
                    }
                }
            }
        },
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                collect_into(item, out)?;
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map {
                collect_into(v, out)?;
            }
        }
        serde_yaml::Value::Tagged(tagged) => collect_into(&tagged.value, out)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_traversal() {
        let Scalar::Single(Selector::Traversal(t)) =
            SelectorParser::parse_scalar("${constant.greeting.out}").unwrap()
        else {
            panic!("expected single traversal");
        };
        assert_eq!(t.parts, vec!["constant", "greeting", "out"]);
    }

    #[test]
    fn parse_call_with_traversal_args() {
        let Scalar::Single(Selector::Call { name, args }) =
            SelectorParser::parse_scalar("${concat(feed.a.out, feed.b.out)}").unwrap()
        else {
            panic!("expected call");
        };
        assert_eq!(name, "concat");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].parts, vec!["feed", "b", "out"]);
    }

    #[test]
    fn parse_template_mixes_text_and_selectors() {
        let Scalar::Template(segments) =
            SelectorParser::parse_scalar("got ${a.x.out} and ${b.y.out}").unwrap()
        else {
            panic!("expected template");
        };
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], Segment::Text("got ".to_string()));
    }

    #[test]
    fn plain_string_is_literal() {
        assert_eq!(
            SelectorParser::parse_scalar("no selectors here").unwrap(),
            Scalar::Literal("no selectors here".to_string())
        );
    }

    #[test]
    fn unclosed_selector_is_an_error() {
        let result = SelectorParser::parse_scalar("${a.b");
        assert!(matches!(result, Err(WeftError::Selector { .. })));
    }

    #[test]
    fn invalid_identifier_is_an_error() {
        assert!(SelectorParser::parse_expression("123abc.out").is_err());
        assert!(SelectorParser::parse_expression("").is_err());
    }

    #[test]
    fn numeric_steps_allowed_after_root() {
        let t = SelectorParser::parse_traversal("feed.a.items.0").unwrap();
        assert_eq!(t.parts, vec!["feed", "a", "items", "0"]);
    }

    #[test]
    fn collect_walks_nested_blocks_depth_first() {
        let body: serde_yaml::Value = serde_yaml::from_str(
            r#"
input: ${source.s.out}
forward:
  target: ${sink.k.out}
  all: ${concat(source.s.out, sink.k.out)}
"#,
        )
        .unwrap();

        let traversals = collect_traversals(&body).unwrap();
        let rendered: Vec<String> = traversals.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["source.s.out", "sink.k.out", "source.s.out", "sink.k.out"]
        );
    }

    #[test]
    fn collect_ignores_plain_values() {
        let body: serde_yaml::Value = serde_yaml::from_str("value: 42\nname: plain").unwrap();
        assert!(collect_traversals(&body).unwrap().is_empty());
    }

    #[test]
    fn selector_raw_roundtrip() {
        let sel = SelectorParser::parse_expression("concat(a.x, b.y)").unwrap();
        assert_eq!(sel.raw(), "${concat(a.x, b.y)}");
    }
}
