//! The dependency graph engine.
//!
//! Stores node identities and directed edges where `from -> to` means *from
//! depends on to*. The graph is acyclic at every observable moment: cycles
//! are rejected at edge insertion. Nodes themselves live in the flow
//! runtime's arena; the graph holds only [`NodeId`]s.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::cmp::Reverse;
use weft_core::error::GraphError;
use weft_core::types::NodeId;

/// A directed dependency edge: `from` depends on `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// The depending node.
    pub from: NodeId,
    /// The node being depended on.
    pub to: NodeId,
}

impl Edge {
    /// Create a new edge.
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

/// A directed acyclic dependency graph over node IDs.
#[derive(Debug, Default)]
pub struct Graph {
    /// Nodes in insertion order.
    nodes: Vec<NodeId>,
    present: HashSet<NodeId>,
    /// Edges in insertion order.
    edges: Vec<Edge>,
    edge_set: HashSet<(NodeId, NodeId)>,
    /// Direct dependencies of each node.
    outgoing: HashMap<NodeId, Vec<NodeId>>,
    /// Direct dependants of each node.
    incoming: HashMap<NodeId, Vec<NodeId>>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. A failed insert has no observable effect.
    pub fn add(&mut self, id: NodeId) -> Result<(), GraphError> {
        if self.present.contains(&id) {
            return Err(GraphError::DuplicateNode {
                node: id.to_string(),
            });
        }
        self.present.insert(id);
        self.nodes.push(id);
        self.outgoing.entry(id).or_default();
        self.incoming.entry(id).or_default();
        Ok(())
    }

    /// Insert a dependency edge.
    ///
    /// Rejects self-edges, missing endpoints, and any edge whose insertion
    /// would create a cycle. An exact duplicate is a silent no-op.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfEdge {
                node: from.to_string(),
            });
        }
        for endpoint in [from, to] {
            if !self.present.contains(&endpoint) {
                return Err(GraphError::UnknownNode {
                    node: endpoint.to_string(),
                });
            }
        }
        if self.edge_set.contains(&(from, to)) {
            return Ok(());
        }
        // A path from `to` back to `from` would close a cycle.
        if self.reaches(to, from) {
            return Err(GraphError::Cycle {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.edge_set.insert((from, to));
        self.edges.push(Edge::new(from, to));
        self.outgoing.get_mut(&from).expect("endpoint present").push(to);
        self.incoming.get_mut(&to).expect("endpoint present").push(from);
        Ok(())
    }

    /// Whether `target` is reachable from `start` along dependency edges.
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.dependencies(id).iter().copied());
            }
        }
        false
    }

    /// Whether the graph contains a node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.present.contains(&id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().copied()
    }

    /// Nodes with no outgoing edges (depending on nothing).
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|id| self.dependencies(*id).is_empty())
            .collect()
    }

    /// Nodes with no incoming edges (nothing depends on them).
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|id| self.dependants(*id).is_empty())
            .collect()
    }

    /// Direct dependencies of a node.
    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct dependants of a node.
    pub fn dependants(&self, id: NodeId) -> &[NodeId] {
        self.incoming.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Visit every node reachable from `start` (through dependant edges) such
    /// that each node is visited only after all of its visited dependencies.
    ///
    /// Starting from [`Graph::leaves`] walks the entire graph bottom-up.
    /// Sibling order is tie-broken by node ID, which follows insertion
    /// sequence.
    pub fn walk_topological<E, F>(&self, start: &[NodeId], mut f: F) -> Result<(), E>
    where
        F: FnMut(NodeId) -> Result<(), E>,
    {
        // Everything reachable from the start set through dependants.
        let mut reachable = HashSet::new();
        let mut queue: VecDeque<NodeId> = start.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if reachable.insert(id) {
                queue.extend(self.dependants(id).iter().copied());
            }
        }

        let mut in_degree: HashMap<NodeId, usize> = reachable
            .iter()
            .map(|id| {
                let deps = self
                    .dependencies(*id)
                    .iter()
                    .filter(|dep| reachable.contains(dep))
                    .count();
                (*id, deps)
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| Reverse(*id))
            .collect();

        while let Some(Reverse(id)) = ready.pop() {
            f(id)?;
            for dependant in self.dependants(id) {
                if let Some(degree) = in_degree.get_mut(dependant) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(*dependant));
                    }
                }
            }
        }

        Ok(())
    }

    /// Transitive reduction: remove every edge `a -> c` for which a longer
    /// path `a -> .. -> c` exists. Preserves reachability; idempotent.
    pub fn reduce(&mut self) {
        let snapshot = self.edges.clone();
        for edge in snapshot {
            if self.has_indirect_path(edge.from, edge.to) {
                self.remove_edge(edge.from, edge.to);
            }
        }
    }

    /// Whether `to` is reachable from `from` without using the direct edge.
    fn has_indirect_path(&self, from: NodeId, to: NodeId) -> bool {
        self.dependencies(from)
            .iter()
            .filter(|first| **first != to)
            .any(|first| self.reaches(*first, to))
    }

    fn remove_edge(&mut self, from: NodeId, to: NodeId) {
        if !self.edge_set.remove(&(from, to)) {
            return;
        }
        self.edges.retain(|e| !(e.from == from && e.to == to));
        if let Some(deps) = self.outgoing.get_mut(&from) {
            deps.retain(|id| *id != to);
        }
        if let Some(deps) = self.incoming.get_mut(&to) {
            deps.retain(|id| *id != from);
        }
    }

    /// Produce a DOT description of the graph for external rendering.
    pub fn marshal_dot(&self, label: impl Fn(NodeId) -> String) -> String {
        let mut out = String::from("digraph weft {\n");
        for id in self.nodes() {
            out.push_str(&format!("    \"{}\";\n", label(id)));
        }
        for edge in self.edges() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                label(edge.from),
                label(edge.to)
            ));
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u32) -> NodeId {
        NodeId::new(id)
    }

    fn graph_with(nodes: u32, edges: &[(u32, u32)]) -> Graph {
        let mut graph = Graph::new();
        for id in 0..nodes {
            graph.add(n(id)).unwrap();
        }
        for (from, to) in edges {
            graph.add_edge(n(*from), n(*to)).unwrap();
        }
        graph
    }

    #[test]
    fn duplicate_node_rejected_without_effect() {
        let mut graph = Graph::new();
        graph.add(n(0)).unwrap();
        let err = graph.add(n(0)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn self_edge_rejected() {
        let mut graph = graph_with(1, &[]);
        let err = graph.add_edge(n(0), n(0)).unwrap_err();
        assert!(matches!(err, GraphError::SelfEdge { .. }));
    }

    #[test]
    fn missing_endpoint_rejected() {
        let mut graph = graph_with(1, &[]);
        let err = graph.add_edge(n(0), n(9)).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode { .. }));
    }

    #[test]
    fn duplicate_edge_is_a_silent_noop() {
        let mut graph = graph_with(2, &[(0, 1)]);
        graph.add_edge(n(0), n(1)).unwrap();
        assert_eq!(graph.edges().count(), 1);
    }

    #[test]
    fn two_node_cycle_rejected() {
        let mut graph = graph_with(2, &[(0, 1)]);
        let err = graph.add_edge(n(1), n(0)).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
        assert_eq!(graph.edges().count(), 1);
    }

    #[test]
    fn longer_cycle_rejected() {
        let mut graph = graph_with(3, &[(0, 1), (1, 2)]);
        let err = graph.add_edge(n(2), n(0)).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn leaves_and_roots() {
        // 2 -> 1 -> 0, plus isolated 3.
        let graph = graph_with(4, &[(2, 1), (1, 0)]);
        assert_eq!(graph.leaves(), vec![n(0), n(3)]);
        assert_eq!(graph.roots(), vec![n(2), n(3)]);
    }

    #[test]
    fn neighbor_queries() {
        let graph = graph_with(3, &[(2, 0), (2, 1)]);
        assert_eq!(graph.dependencies(n(2)), &[n(0), n(1)]);
        assert_eq!(graph.dependants(n(0)), &[n(2)]);
        assert!(graph.dependencies(n(0)).is_empty());
    }

    #[test]
    fn topological_walk_respects_edges() {
        // Diamond: 3 depends on 1 and 2, both depend on 0.
        let graph = graph_with(4, &[(1, 0), (2, 0), (3, 1), (3, 2)]);

        let mut order = Vec::new();
        graph
            .walk_topological::<(), _>(&graph.leaves(), |id| {
                order.push(id);
                Ok(())
            })
            .unwrap();

        assert_eq!(order.len(), 4);
        let pos = |id: NodeId| order.iter().position(|x| *x == id).unwrap();
        for edge in graph.edges() {
            assert!(pos(edge.to) < pos(edge.from), "dependency visited first");
        }
    }

    #[test]
    fn topological_walk_is_deterministic() {
        let graph = graph_with(4, &[(1, 0), (2, 0), (3, 1), (3, 2)]);

        let mut order = Vec::new();
        graph
            .walk_topological::<(), _>(&graph.leaves(), |id| {
                order.push(id);
                Ok(())
            })
            .unwrap();
        // Siblings 1 and 2 tie-break by insertion sequence.
        assert_eq!(order, vec![n(0), n(1), n(2), n(3)]);
    }

    #[test]
    fn topological_walk_aborts_on_error() {
        let graph = graph_with(2, &[(1, 0)]);
        let mut visited = 0;
        let result = graph.walk_topological(&graph.leaves(), |_| {
            visited += 1;
            Err("boom")
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(visited, 1);
    }

    #[test]
    fn reduce_removes_diamond_shortcut() {
        // a=3 -> b=1, c=2; b,c -> d=0; plus redundant a -> d.
        let mut graph = graph_with(4, &[(3, 1), (3, 2), (1, 0), (2, 0), (3, 0)]);
        graph.reduce();

        assert!(!graph.edge_set.contains(&(n(3), n(0))));
        assert_eq!(graph.edges().count(), 4);
        // Reachability from a to d is preserved through b and c.
        assert!(graph.reaches(n(3), n(0)));
    }

    #[test]
    fn reduce_is_idempotent() {
        let mut graph = graph_with(4, &[(3, 1), (3, 2), (1, 0), (2, 0), (3, 0)]);
        graph.reduce();
        let after_once: Vec<Edge> = graph.edges().collect();
        graph.reduce();
        let after_twice: Vec<Edge> = graph.edges().collect();
        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn reduce_preserves_reachability() {
        let mut graph = graph_with(5, &[(4, 3), (3, 2), (4, 2), (2, 1), (4, 1), (1, 0)]);

        let mut before = Vec::new();
        for u in graph.nodes() {
            for v in graph.nodes() {
                if u != v {
                    before.push((u, v, graph.reaches(u, v)));
                }
            }
        }

        graph.reduce();
        for (u, v, reachable) in before {
            assert_eq!(graph.reaches(u, v), reachable, "{u} -> {v}");
        }
    }

    #[test]
    fn reduce_keeps_chains_intact() {
        let mut graph = graph_with(3, &[(2, 1), (1, 0)]);
        graph.reduce();
        assert_eq!(graph.edges().count(), 2);
    }

    #[test]
    fn marshal_dot_lists_nodes_and_edges() {
        let graph = graph_with(2, &[(1, 0)]);
        let dot = graph.marshal_dot(|id| id.to_string());
        assert!(dot.starts_with("digraph weft {"));
        assert!(dot.contains("\"node_0\";"));
        assert!(dot.contains("\"node_1\" -> \"node_0\";"));
    }
}
