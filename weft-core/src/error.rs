//! Error types for Weft.
//!
//! Errors are grouped by the load phase that produces them: parsing, decoding,
//! reference resolution, graph construction, and component building. Runtime
//! failures (a worker exiting, an update being rejected) are logged by the
//! flow runtime and never surface through these types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node with the same identity is already present.
    #[error("node '{node}' is already present in the graph")]
    DuplicateNode {
        /// Display name of the duplicate node.
        node: String,
    },

    /// An edge endpoint does not exist in the graph.
    #[error("node '{node}' is not in the graph")]
    UnknownNode {
        /// Display name of the missing node.
        node: String,
    },

    /// An edge would connect a node to itself.
    #[error("node '{node}' cannot depend on itself")]
    SelfEdge {
        /// Display name of the offending node.
        node: String,
    },

    /// Inserting an edge would create a cycle.
    #[error("edge from '{from}' to '{to}' would create a cycle")]
    Cycle {
        /// Display name of the edge source.
        from: String,
        /// Display name of the edge target.
        to: String,
    },
}

/// The main error type for Weft operations.
#[derive(Error, Debug)]
pub enum WeftError {
    /// File I/O failed.
    #[error("failed to read '{path}': {cause}")]
    Io {
        /// The path that could not be read or written.
        path: PathBuf,
        /// Description of the I/O failure.
        cause: String,
    },

    /// Malformed configuration syntax.
    #[error("failed to parse configuration{}: {cause}", fmt_path(.path))]
    Parse {
        /// The file being parsed, if known.
        path: Option<PathBuf>,
        /// The underlying parse failure.
        cause: String,
    },

    /// The configuration does not match the expected schema.
    #[error("invalid configuration at {location}: {cause}")]
    Decode {
        /// Where in the document the mismatch was found.
        location: String,
        /// Description of the mismatch.
        cause: String,
    },

    /// A traversal names a nonexistent or mistyped field of a known component.
    #[error("cannot resolve '{traversal}': {cause}")]
    Resolve {
        /// The traversal that failed to resolve.
        traversal: String,
        /// Reason for the resolution failure.
        cause: String,
    },

    /// Invalid selector expression syntax.
    #[error("invalid selector '{selector}': {cause}")]
    Selector {
        /// The selector with invalid syntax.
        selector: String,
        /// Description of the syntax error.
        cause: String,
    },

    /// A selector could not be evaluated against the evaluation context.
    #[error("cannot evaluate '{selector}': {cause}")]
    Eval {
        /// The selector being evaluated.
        selector: String,
        /// Reason for the evaluation failure.
        cause: String,
    },

    /// Graph construction failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A component builder rejected its block.
    #[error("failed to build component '{node}': {cause}")]
    Build {
        /// The component node being built.
        node: String,
        /// Reason reported by the builder.
        cause: String,
    },

    /// An operation was invoked in the wrong lifecycle phase.
    #[error("cannot {operation} while the flow is {phase}")]
    Lifecycle {
        /// The operation that was attempted.
        operation: &'static str,
        /// The phase the flow was in.
        phase: String,
    },
}

fn fmt_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" '{}'", p.display()),
        None => String::new(),
    }
}

/// Result type alias using [`WeftError`].
pub type Result<T> = std::result::Result<T, WeftError>;
