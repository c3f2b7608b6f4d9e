//! Configuration loader: file bytes to block definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use weft_core::block::BlockDefinition;
use weft_core::component::RegistrySchema;
use weft_core::diag::{Diagnostic, Diagnostics};
use weft_core::error::{Result, WeftError};

/// Log verbosity selectable from the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level logging.
    Trace,
    /// Debug-level logging.
    Debug,
    /// Info-level logging.
    Info,
    /// Warn-level logging.
    Warn,
    /// Error-level logging.
    Error,
}

impl LogLevel {
    /// The env-filter directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Log output format selectable from the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-oriented multi-line output.
    Pretty,
    /// Single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// The top-level configuration document.
///
/// Exactly three top-level attributes are recognized; anything else is a
/// decode error.
///
/// # Example
///
/// ```yaml
/// log_level: debug
/// log_format: json
///
/// components:
///   - kind: constant
///     labels: [greeting]
///     body:
///       value: "hello"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowDocument {
    /// Log verbosity for the runtime.
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    /// Log output format for the runtime.
    #[serde(default)]
    pub log_format: Option<LogFormat>,

    /// Component blocks.
    #[serde(default)]
    pub components: Vec<BlockDefinition>,
}

impl FlowDocument {
    /// Parse a document from YAML text.
    ///
    /// Syntax problems surface as [`WeftError::Parse`]; schema mismatches
    /// (unknown top-level attributes included) as [`WeftError::Decode`].
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|e| WeftError::Parse {
                path: None,
                cause: e.to_string(),
            })?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(|e| WeftError::Decode {
            location: "document".to_string(),
            cause: e.to_string(),
        })
    }

    /// Read and parse a document from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WeftError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        Self::from_yaml(&contents).map_err(|e| match e {
            WeftError::Parse { cause, .. } => WeftError::Parse {
                path: Some(path.to_path_buf()),
                cause,
            },
            other => other,
        })
    }
}

/// Match blocks against the registry schema.
///
/// Returns the recognized blocks; unknown kinds and label-arity mismatches
/// accumulate error diagnostics.
pub fn match_blocks(
    document: &FlowDocument,
    schema: &RegistrySchema,
) -> (Vec<BlockDefinition>, Diagnostics) {
    let mut matched = Vec::new();
    let mut diags = Diagnostics::new();

    for block in &document.components {
        let Some(kind) = schema.get(&block.kind) else {
            diags.push(Diagnostic::error(format!(
                "unrecognized component kind '{}'",
                block.kind
            )));
            continue;
        };
        if block.labels.len() != kind.labels {
            diags.push(Diagnostic::error(format!(
                "component '{}' expects {} label(s), got {}",
                block.kind,
                kind.labels,
                block.labels.len()
            )));
            continue;
        }
        if !matches!(block.body, serde_yaml::Value::Mapping(_)) {
            diags.push(Diagnostic::error(format!(
                "component '{}' body must be a mapping",
                block.reference()
            )));
            continue;
        }
        matched.push(block.clone());
    }

    (matched, diags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::component::ComponentSchema;
    use weft_core::value::Shape;

    fn schema() -> RegistrySchema {
        RegistrySchema::new()
            .with_kind(ComponentSchema::new("constant", 1, Shape::Any))
            .with_kind(ComponentSchema::new("relay", 1, Shape::Any))
    }

    const SIMPLE_DOC: &str = r#"
log_level: debug
log_format: json

components:
  - kind: constant
    labels: [greeting]
    body:
      value: "hello"
  - kind: relay
    labels: [echo]
    body:
      input: ${constant.greeting.out}
"#;

    #[test]
    fn parse_simple_document() {
        let doc = FlowDocument::from_yaml(SIMPLE_DOC).unwrap();
        assert_eq!(doc.log_level, Some(LogLevel::Debug));
        assert_eq!(doc.log_format, Some(LogFormat::Json));
        assert_eq!(doc.components.len(), 2);
    }

    #[test]
    fn empty_document_is_valid() {
        let doc = FlowDocument::from_yaml("").unwrap();
        assert!(doc.components.is_empty());
        assert!(doc.log_level.is_none());
    }

    #[test]
    fn syntax_error_is_a_parse_error() {
        let result = FlowDocument::from_yaml("components: [unclosed");
        assert!(matches!(result, Err(WeftError::Parse { .. })));
    }

    #[test]
    fn unknown_top_level_attribute_is_a_decode_error() {
        let result = FlowDocument::from_yaml("log_levle: debug");
        assert!(matches!(result, Err(WeftError::Decode { .. })));
    }

    #[test]
    fn match_accepts_known_kinds() {
        let doc = FlowDocument::from_yaml(SIMPLE_DOC).unwrap();
        let (blocks, diags) = match_blocks(&doc, &schema());
        assert_eq!(blocks.len(), 2);
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_kind_is_an_error_diagnostic() {
        let doc = FlowDocument::from_yaml(
            "components:\n  - kind: mystery\n    labels: [x]\n    body: {}",
        )
        .unwrap();
        let (blocks, diags) = match_blocks(&doc, &schema());
        assert!(blocks.is_empty());
        assert!(diags.has_errors());
    }

    #[test]
    fn label_arity_is_checked() {
        let doc =
            FlowDocument::from_yaml("components:\n  - kind: constant\n    body: {}").unwrap();
        let (blocks, diags) = match_blocks(&doc, &schema());
        assert!(blocks.is_empty());
        assert!(diags.has_errors());
    }

    #[test]
    fn from_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.yaml");
        std::fs::write(&path, "components: [unclosed").unwrap();

        let err = FlowDocument::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("flow.yaml"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = FlowDocument::from_file(Path::new("/definitely/missing.yaml"));
        assert!(matches!(result, Err(WeftError::Io { .. })));
    }

    #[test]
    fn log_level_round_trips_from_str() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }
}
