//! Symbolic component references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dotted symbolic name identifying a component.
///
/// A reference is an ordered sequence of opaque name segments, e.g.
/// `["remote", "http", "users"]` for the block `remote.http "users" { .. }`.
/// The prefix (all but the last segment) identifies the component kind; the
/// tail identifies the instance. References are immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference(Vec<String>);

impl Reference {
    /// Create a reference from its segments.
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Create a reference from a block's kind and labels.
    ///
    /// The kind may itself be dotted (`remote.http`); each dot-separated part
    /// becomes a segment, followed by one segment per label.
    pub fn from_block(kind: &str, labels: &[String]) -> Self {
        let mut segments: Vec<String> = kind.split('.').map(str::to_string).collect();
        segments.extend(labels.iter().cloned());
        Self(segments)
    }

    /// The segments of this reference.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the reference has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The kind prefix: all segments but the last.
    pub fn prefix(&self) -> Reference {
        let end = self.0.len().saturating_sub(1);
        Reference(self.0[..end].to_vec())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
