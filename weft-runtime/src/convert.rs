//! One-shot conversion of foreign configuration dialects.
//!
//! A pluggable per-format [`Converter`] turns input bytes into a Weft
//! configuration document plus diagnostics. Output is suppressed when a
//! critical diagnostic is present, or when an error diagnostic is present and
//! bypassing was not requested.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use weft_core::diag::{Diagnostic, Diagnostics, Severity};

/// A per-format translator into the Weft configuration dialect.
pub trait Converter: Send + Sync {
    /// The source format name this converter handles.
    fn format(&self) -> &'static str;

    /// Translate input bytes, accumulating diagnostics.
    fn convert(&self, input: &[u8], extra_args: &[String]) -> (Vec<u8>, Diagnostics);
}

/// Options for one conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// The source format name.
    pub format: String,
    /// Emit output even when error-level diagnostics are present.
    /// Critical diagnostics always suppress output.
    pub bypass_errors: bool,
    /// Extra arguments forwarded to the converter.
    pub extra_args: Vec<String>,
    /// Write a plain-text diagnostic report to this path.
    pub report: Option<PathBuf>,
}

/// Error from the convert pipeline.
#[derive(Debug)]
pub enum ConvertError {
    /// No converter is registered for the requested format.
    UnknownFormat {
        /// The requested format.
        format: String,
        /// The formats that are available.
        supported: Vec<String>,
    },
    /// Reading input or writing output failed.
    Io {
        /// The path involved, or "-" for standard streams.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// Conversion produced blocking diagnostics.
    Diagnostics(Diagnostics),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFormat { format, supported } => write!(
                f,
                "unsupported source format '{}'; supported formats: {}",
                format,
                supported.join(", ")
            ),
            Self::Io { path, source } => {
                write!(f, "conversion I/O failed at '{}': {}", path.display(), source)
            }
            Self::Diagnostics(diags) => {
                writeln!(f, "conversion failed:")?;
                write!(f, "{diags}")
            }
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Diagnostics(diags) => Some(diags),
            Self::UnknownFormat { .. } => None,
        }
    }
}

/// Registry of converters keyed by source format.
pub struct ConverterRegistry {
    converters: BTreeMap<&'static str, Box<dyn Converter>>,
}

impl ConverterRegistry {
    /// Create a registry with the built-in converters.
    pub fn new() -> Self {
        let mut registry = Self {
            converters: BTreeMap::new(),
        };
        registry.register(Box::new(JsonConverter));
        registry
    }

    /// Register a converter under its format name.
    pub fn register(&mut self, converter: Box<dyn Converter>) {
        self.converters.insert(converter.format(), converter);
    }

    /// Supported format names, in order.
    pub fn supported_formats(&self) -> Vec<String> {
        self.converters.keys().map(|k| k.to_string()).collect()
    }

    /// Convert input bytes, honoring the suppression rule.
    ///
    /// Output is returned iff no critical diagnostic is present and either no
    /// error diagnostic is present or `bypass_errors` is set. A report is
    /// written regardless of suppression when a report path is supplied.
    pub fn convert_bytes(
        &self,
        options: &ConvertOptions,
        input: &[u8],
    ) -> Result<Vec<u8>, ConvertError> {
        let converter = self.converters.get(options.format.as_str()).ok_or_else(|| {
            ConvertError::UnknownFormat {
                format: options.format.clone(),
                supported: self.supported_formats(),
            }
        })?;

        let (output, diags) = converter.convert(input, &options.extra_args);

        if let Some(report) = &options.report {
            let file = std::fs::File::create(report).map_err(|e| ConvertError::Io {
                path: report.clone(),
                source: e,
            })?;
            diags
                .generate_report(file)
                .map_err(|e| ConvertError::Io {
                    path: report.clone(),
                    source: e,
                })?;
        }

        let has_error = diags.has_severity(Severity::Error);
        let has_critical = diags.has_severity(Severity::Critical);
        if has_critical || (has_error && !options.bypass_errors) {
            return Err(ConvertError::Diagnostics(diags));
        }

        Ok(output)
    }

    /// Convert from a file (or standard input) to a file (or standard output).
    pub fn convert_file(
        &self,
        options: &ConvertOptions,
        input: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<(), ConvertError> {
        let bytes = match input {
            Some(path) => std::fs::read(path).map_err(|e| ConvertError::Io {
                path: path.to_path_buf(),
                source: e,
            })?,
            None => {
                let mut buf = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut buf)
                    .map_err(|e| ConvertError::Io {
                        path: PathBuf::from("-"),
                        source: e,
                    })?;
                buf
            }
        };

        let converted = self.convert_bytes(options, &bytes)?;

        match output {
            Some(path) => std::fs::write(path, converted).map_err(|e| ConvertError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
            None => std::io::stdout()
                .write_all(&converted)
                .map_err(|e| ConvertError::Io {
                    path: PathBuf::from("-"),
                    source: e,
                }),
        }
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a space-delimited extra-argument string.
pub fn parse_extra_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

/// Converts the JSON dialect of the configuration document to YAML.
///
/// The input mirrors the YAML document shape:
///
/// ```json
/// {
///   "log_level": "info",
///   "components": [
///     { "kind": "constant", "labels": ["greeting"], "body": { "value": 1 } }
///   ]
/// }
/// ```
struct JsonConverter;

const KNOWN_KEYS: &[&str] = &["log_level", "log_format", "components"];

impl Converter for JsonConverter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn convert(&self, input: &[u8], _extra_args: &[String]) -> (Vec<u8>, Diagnostics) {
        let mut diags = Diagnostics::new();

        let parsed: serde_json::Value = match serde_json::from_slice(input) {
            Ok(value) => value,
            Err(err) => {
                diags.push(Diagnostic::critical(format!("invalid JSON input: {err}")));
                return (Vec::new(), diags);
            }
        };
        let serde_json::Value::Object(root) = parsed else {
            diags.push(Diagnostic::critical(
                "top-level value must be an object".to_string(),
            ));
            return (Vec::new(), diags);
        };

        let mut document = serde_json::Map::new();
        for (key, value) in root {
            if KNOWN_KEYS.contains(&key.as_str()) {
                document.insert(key, value);
            } else {
                diags.push(Diagnostic::error(format!(
                    "unknown top-level attribute '{key}'"
                )));
            }
        }

        match document.get("components") {
            None => diags.push(Diagnostic::warning(
                "configuration declares no components".to_string(),
            )),
            Some(serde_json::Value::Array(_)) => {}
            Some(_) => {
                diags.push(Diagnostic::error(
                    "'components' must be a list of blocks".to_string(),
                ));
            }
        }

        match serde_yaml::to_string(&document) {
            Ok(yaml) => (yaml.into_bytes(), diags),
            Err(err) => {
                diags.push(Diagnostic::critical(format!(
                    "cannot serialize output document: {err}"
                )));
                (Vec::new(), diags)
            }
        }
    }
}
