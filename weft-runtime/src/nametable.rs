//! The nametable: references to component nodes, plus traversal lookup.
//!
//! Registration keys each node by its [`Reference`] and remembers the shape
//! of its exported state. Traversal lookup greedily matches the longest
//! registered prefix; the remaining steps are validated against that shape so
//! `foo.bar.nonexistent` is rejected during Load, before any value exists. A
//! traversal whose prefix matches nothing is silently ignored at this stage:
//! it may name a built-in or be a typo the expression evaluator will reject.

use std::collections::{BTreeMap, HashMap};
use weft_core::diag::{Diagnostic, Diagnostics};
use weft_core::error::GraphError;
use weft_core::expr::Traversal;
use weft_core::reference::Reference;
use weft_core::types::NodeId;
use weft_core::value::Shape;

struct Entry {
    id: NodeId,
    shape: Shape,
}

/// Bijective map from references to component nodes.
#[derive(Default)]
pub struct Nametable {
    entries: BTreeMap<Reference, Entry>,
    visual: PrefixGraph,
}

impl Nametable {
    /// Create an empty nametable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under its reference.
    pub fn add(&mut self, reference: Reference, id: NodeId, shape: Shape) -> Result<(), GraphError> {
        if self.entries.contains_key(&reference) {
            return Err(GraphError::DuplicateNode {
                node: reference.to_string(),
            });
        }
        self.visual.add(&reference);
        self.entries.insert(reference, Entry { id, shape });
        Ok(())
    }

    /// Look up a node by exact reference.
    pub fn get(&self, reference: &Reference) -> Option<NodeId> {
        self.entries.get(reference).map(|e| e.id)
    }

    /// Number of registered references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the nametable is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a traversal to a registered node.
    ///
    /// Greedy longest-prefix match over registered references. No prefix
    /// match returns `None` with no diagnostic. A match whose suffix does not
    /// name a field of the target's exported-state shape returns `None` with
    /// an error diagnostic.
    pub fn lookup_traversal(&self, traversal: &Traversal) -> (Option<NodeId>, Diagnostics) {
        let mut diags = Diagnostics::new();

        for split in (1..=traversal.parts.len()).rev() {
            let prefix = Reference::new(traversal.parts[..split].iter().cloned());
            let Some(entry) = self.entries.get(&prefix) else {
                continue;
            };

            let suffix = &traversal.parts[split..];
            return match entry.shape.walk(suffix) {
                Ok(_) => (Some(entry.id), diags),
                Err(err) => {
                    diags.push(Diagnostic::error(format!(
                        "invalid reference '{traversal}': component '{prefix}' {err}",
                    )));
                    (None, diags)
                }
            };
        }

        (None, diags)
    }

    /// Iterate over registered references and their node IDs, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Reference, NodeId)> {
        self.entries.iter().map(|(r, e)| (r, e.id))
    }

    /// DOT description of the lookup structure for external rendering.
    pub fn marshal_dot(&self) -> String {
        self.visual.marshal_dot()
    }
}

/// Visual mirror of the lookup structure: a tree of reference prefixes.
#[derive(Default)]
struct PrefixGraph {
    /// Dotted prefixes in insertion order.
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    /// Parent -> child links by node index.
    edges: Vec<(usize, usize)>,
}

impl PrefixGraph {
    fn add(&mut self, reference: &Reference) {
        let mut parent: Option<usize> = None;
        let mut prefix = String::new();
        for segment in reference.segments() {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);

            let idx = match self.index.get(&prefix) {
                Some(idx) => *idx,
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(prefix.clone());
                    self.index.insert(prefix.clone(), idx);
                    idx
                }
            };
            if let Some(parent) = parent {
                if !self.edges.contains(&(parent, idx)) {
                    self.edges.push((parent, idx));
                }
            }
            parent = Some(idx);
        }
    }

    fn marshal_dot(&self) -> String {
        let mut out = String::from("digraph nametable {\n");
        for name in &self.nodes {
            out.push_str(&format!("    \"{name}\";\n"));
        }
        for (parent, child) in &self.edges {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.nodes[*parent], self.nodes[*child]
            ));
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::expr::SelectorParser;

    fn shape() -> Shape {
        Shape::record([("out", Shape::Any)])
    }

    fn table() -> Nametable {
        let mut nt = Nametable::new();
        nt.add(Reference::new(["source", "s"]), NodeId::new(0), shape())
            .unwrap();
        nt.add(Reference::new(["filter", "f"]), NodeId::new(1), shape())
            .unwrap();
        nt
    }

    fn traversal(path: &str) -> Traversal {
        SelectorParser::parse_traversal(path).unwrap()
    }

    #[test]
    fn duplicate_reference_rejected() {
        let mut nt = table();
        let err = nt
            .add(Reference::new(["source", "s"]), NodeId::new(9), shape())
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode { .. }));
    }

    #[test]
    fn longest_prefix_resolves() {
        let nt = table();
        let (node, diags) = nt.lookup_traversal(&traversal("source.s.out"));
        assert_eq!(node, Some(NodeId::new(0)));
        assert!(diags.is_empty());
    }

    #[test]
    fn bare_reference_resolves_without_suffix() {
        let nt = table();
        let (node, diags) = nt.lookup_traversal(&traversal("filter.f"));
        assert_eq!(node, Some(NodeId::new(1)));
        assert!(diags.is_empty());
    }

    #[test]
    fn unresolved_traversal_is_silent() {
        let nt = table();
        let (node, diags) = nt.lookup_traversal(&traversal("foo.bar.baz"));
        assert_eq!(node, None);
        assert!(diags.is_empty());
    }

    #[test]
    fn bad_suffix_yields_error_diagnostic() {
        let nt = table();
        let (node, diags) = nt.lookup_traversal(&traversal("source.s.nonexistent"));
        assert_eq!(node, None);
        assert!(diags.has_errors());
    }

    #[test]
    fn deep_suffix_through_any_is_accepted() {
        let nt = table();
        let (node, diags) = nt.lookup_traversal(&traversal("source.s.out.deep.field"));
        assert_eq!(node, Some(NodeId::new(0)));
        assert!(diags.is_empty());
    }

    #[test]
    fn visual_graph_mirrors_prefixes() {
        let nt = table();
        let dot = nt.marshal_dot();
        assert!(dot.contains("\"source\" -> \"source.s\";"));
        assert!(dot.contains("\"filter\" -> \"filter.f\";"));
    }
}
