//! The flow runtime: load a configuration, build the graph, run components.
//!
//! `Load` parses the document, inserts nodes, wires dependency edges from
//! resolved traversals, reduces the graph, and builds every component in
//! topological order. `Run` starts one worker task per component plus a
//! single arbiter that serializes change propagation: a component notifying a
//! state change causes each of its direct dependants to be re-evaluated under
//! the graph write lock. Propagation is one hop per notification; a
//! dependant's own state change drives the next hop.

use crate::dag::Graph;
use crate::loader::{self, FlowDocument, LogFormat, LogLevel};
use crate::nametable::Nametable;
use dashmap::DashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use weft_core::block::BlockDefinition;
use weft_core::component::{BuildContext, Component, Notifier, Registry};
use weft_core::diag::{Diagnostic, Diagnostics};
use weft_core::error::{Result, WeftError};
use weft_core::eval::EvalContext;
use weft_core::reference::Reference;
use weft_core::types::NodeId;

/// Lifecycle phase of a [`Flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unloaded,
    Loaded,
    Running,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unloaded => "unloaded",
            Self::Loaded => "loaded",
            Self::Running => "running",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// A component and its place in the graph.
struct ComponentNode {
    reference: Reference,
    block: BlockDefinition,
    /// Set exactly once during Load's topological build.
    raw: Option<Arc<dyn Component>>,
}

/// Everything guarded by the graph lock.
struct FlowState {
    phase: Phase,
    graph: Graph,
    nametable: Nametable,
    /// Node arena; a [`NodeId`] indexes into this.
    nodes: Vec<ComponentNode>,
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
}

/// Error returned by [`Flow::load`].
#[derive(Debug)]
pub enum LoadError {
    /// A single hard failure: I/O, parse, or a rejected build.
    Fatal(WeftError),
    /// Decode and resolve diagnostics accumulated up to a checkpoint.
    Diagnostics(Diagnostics),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(err) => write!(f, "{err}"),
            Self::Diagnostics(diags) => {
                writeln!(f, "configuration failed with {} diagnostic(s):", diags.len())?;
                write!(f, "{diags}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fatal(err) => Some(err),
            Self::Diagnostics(diags) => Some(diags),
        }
    }
}

impl From<WeftError> for LoadError {
    fn from(err: WeftError) -> Self {
        Self::Fatal(err)
    }
}

impl From<Diagnostics> for LoadError {
    fn from(diags: Diagnostics) -> Self {
        Self::Diagnostics(diags)
    }
}

/// The component graph runtime.
pub struct Flow {
    config_file: PathBuf,
    registry: Arc<dyn Registry>,
    /// The single readers-writer lock over graph, nametable, and node arena.
    state: RwLock<FlowState>,
}

impl Flow {
    /// Create a new flow for a configuration file.
    pub fn new(registry: Arc<dyn Registry>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            registry,
            state: RwLock::new(FlowState {
                phase: Phase::Unloaded,
                graph: Graph::new(),
                nametable: Nametable::new(),
                nodes: Vec::new(),
                log_level: None,
                log_format: None,
            }),
        }
    }

    /// Read the config file and build the component graph.
    ///
    /// Holds the graph write lock for the whole operation. Reloading is not
    /// supported: a flow that has left the unloaded phase rejects further
    /// loads.
    pub async fn load(&self) -> std::result::Result<(), LoadError> {
        let mut state = self.state.write().await;
        if state.phase != Phase::Unloaded {
            return Err(WeftError::Lifecycle {
                operation: "load the configuration",
                phase: state.phase.to_string(),
            }
            .into());
        }

        let document = FlowDocument::from_file(&self.config_file)?;
        state.log_level = document.log_level;
        state.log_format = document.log_format;

        let schema = self.registry.schema();
        let (blocks, mut diags) = loader::match_blocks(&document, &schema);
        if diags.has_errors() {
            return Err(diags.into());
        }

        // First pass: create nodes and register them in the nametable.
        for block in blocks {
            let reference = block.reference();
            let id = NodeId::new(state.nodes.len() as u32);
            let shape = schema
                .get(&block.kind)
                .expect("block was matched against the schema")
                .state_shape
                .clone();

            if let Err(err) = state.nametable.add(reference.clone(), id, shape) {
                diags.push(Diagnostic::error(err.to_string()));
                continue;
            }
            state.graph.add(id).expect("arena ids are unique");
            state.nodes.push(ComponentNode {
                reference,
                block,
                raw: None,
            });
        }
        if diags.has_errors() {
            return Err(diags.into());
        }

        // Second pass: resolve traversals into dependency edges.
        let FlowState {
            graph,
            nametable,
            nodes,
            ..
        } = &mut *state;
        for (idx, node) in nodes.iter().enumerate() {
            let traversals = match node.block.traversals() {
                Ok(traversals) => traversals,
                Err(err) => {
                    diags.push(Diagnostic::error(err.to_string()));
                    continue;
                }
            };
            for traversal in traversals {
                let (target, lookup_diags) = nametable.lookup_traversal(&traversal);
                diags.extend(lookup_diags);
                let Some(target) = target else {
                    continue;
                };
                if let Err(err) = graph.add_edge(NodeId::new(idx as u32), target) {
                    diags.push(Diagnostic::error(err.to_string()));
                }
            }
        }
        if diags.has_errors() {
            return Err(diags.into());
        }

        // Wiring edges from raw traversals leaves shortcuts behind; reduce.
        graph.reduce();

        // The DAG is complete: build components in dependency order.
        let leaves = graph.leaves();
        let deps_of: Vec<Vec<NodeId>> = (0..nodes.len())
            .map(|idx| graph.dependencies(NodeId::new(idx as u32)).to_vec())
            .collect();
        graph.walk_topological::<WeftError, _>(&leaves, |id| {
            let mut ectx = build_eval_context(&deps_of[id.index()], nodes)?;
            if let Some(ectx) = ectx.as_mut() {
                ectx.install_builtins();
            }

            let node = &nodes[id.index()];
            let name = node.reference.to_string();
            let bctx = BuildContext::new(&name, ectx);
            let raw = self
                .registry
                .build(&node.block.kind, &bctx, &node.block)
                .map_err(|e| WeftError::Build {
                    node: name,
                    cause: e.to_string(),
                })?;

            nodes[id.index()].raw = Some(raw);
            Ok(())
        })?;

        state.phase = Phase::Loaded;
        tracing::info!(
            path = %self.config_file.display(),
            components = state.nodes.len(),
            "configuration loaded"
        );
        Ok(())
    }

    /// Run every component until the token is cancelled.
    ///
    /// Returns only after all workers have exited. It is invalid to call
    /// `run` concurrently or more than once.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(1);
        let updated: Arc<DashMap<NodeId, ()>> = Arc::new(DashMap::new());
        let mut workers = Vec::new();

        {
            let mut state = self.state.write().await;
            if state.phase != Phase::Loaded {
                return Err(WeftError::Lifecycle {
                    operation: "run",
                    phase: state.phase.to_string(),
                });
            }
            for node in &state.nodes {
                if node.raw.is_none() {
                    return Err(WeftError::Build {
                        node: node.reference.to_string(),
                        cause: "component was never initialized".to_string(),
                    });
                }
            }

            // Workers start while the lock is held so no notification can
            // race the phase change.
            for (idx, node) in state.nodes.iter().enumerate() {
                let id = NodeId::new(idx as u32);
                let raw = Arc::clone(node.raw.as_ref().expect("checked above"));
                let name = node.reference.to_string();
                let notifier = {
                    let updated = Arc::clone(&updated);
                    let refresh_tx = refresh_tx.clone();
                    Notifier::new(move || {
                        updated.insert(id, ());
                        // Capacity-1 channel: a full channel means a drain is
                        // already pending, so the token can be dropped.
                        let _ = refresh_tx.try_send(());
                    })
                };
                let token = shutdown.clone();
                workers.push(tokio::spawn(async move {
                    match raw.run(token, notifier).await {
                        Ok(()) => tracing::debug!(node = %name, "component exited"),
                        Err(err) => {
                            tracing::error!(node = %name, error = %err, "component exited with error");
                        }
                    }
                }));
            }
            state.phase = Phase::Running;
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                token = refresh_rx.recv() => {
                    if token.is_none() {
                        break;
                    }
                    let ids: Vec<NodeId> = updated.iter().map(|entry| *entry.key()).collect();
                    for id in ids {
                        updated.remove(&id);
                        let mut state = self.state.write().await;
                        self.update_dependants(&mut state, id);
                    }
                }
            }
        }

        for result in futures::future::join_all(workers).await {
            if let Err(err) = result {
                tracing::error!(error = %err, "worker task panicked");
            }
        }

        self.state.write().await.phase = Phase::Terminated;
        Ok(())
    }

    /// Re-evaluate every direct dependant of an updated node.
    ///
    /// Update errors are logged and skipped; propagation beyond one hop is
    /// driven by the dependants' own notifications.
    fn update_dependants(&self, state: &mut FlowState, id: NodeId) {
        tracing::debug!(
            node = %state.nodes[id.index()].reference,
            "handling component with updated state"
        );

        let dependants = state.graph.dependants(id).to_vec();
        for dependant in dependants {
            let deps = state.graph.dependencies(dependant).to_vec();
            let mut ectx = match build_eval_context(&deps, &state.nodes) {
                Ok(ectx) => ectx,
                Err(err) => {
                    tracing::error!(
                        node = %state.nodes[dependant.index()].reference,
                        error = %err,
                        "failed to update component"
                    );
                    continue;
                }
            };
            if let Some(ectx) = ectx.as_mut() {
                ectx.install_builtins();
            }

            let node = &state.nodes[dependant.index()];
            let raw = node.raw.as_ref().expect("initialized during load");
            if let Err(err) = raw.update(ectx.as_ref(), &node.block) {
                tracing::error!(
                    node = %node.reference,
                    error = %err,
                    "failed to update component"
                );
            }
        }
    }

    /// Snapshot of one component's exported state, by reference string.
    pub async fn current_state(&self, reference: &str) -> Option<weft_core::value::Value> {
        let state = self.state.read().await;
        let reference = Reference::new(reference.split('.'));
        let id = state.nametable.get(&reference)?;
        state.nodes[id.index()]
            .raw
            .as_ref()
            .map(|raw| raw.current_state())
    }

    /// Node names in insertion order.
    pub async fn node_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .nodes
            .iter()
            .map(|n| n.reference.to_string())
            .collect()
    }

    /// Dependency edges as `(from, to)` reference strings, in insertion order.
    pub async fn edges(&self) -> Vec<(String, String)> {
        let state = self.state.read().await;
        state
            .graph
            .edges()
            .map(|edge| {
                (
                    state.nodes[edge.from.index()].reference.to_string(),
                    state.nodes[edge.to.index()].reference.to_string(),
                )
            })
            .collect()
    }

    /// DOT description of the dependency graph.
    pub async fn graph_dot(&self) -> String {
        let state = self.state.read().await;
        let FlowState { graph, nodes, .. } = &*state;
        graph.marshal_dot(|id| nodes[id.index()].reference.to_string())
    }

    /// DOT description of the nametable's lookup structure.
    pub async fn nametable_dot(&self) -> String {
        self.state.read().await.nametable.marshal_dot()
    }

    /// Log options declared by the configuration document.
    pub async fn log_options(&self) -> (Option<LogLevel>, Option<LogFormat>) {
        let state = self.state.read().await;
        (state.log_level, state.log_format)
    }
}

/// Snapshot the current state of each direct dependency into a fresh context.
///
/// An empty dependency set yields `None`: the expression needs no free
/// variables.
fn build_eval_context(
    deps: &[NodeId],
    nodes: &[ComponentNode],
) -> Result<Option<EvalContext>> {
    if deps.is_empty() {
        return Ok(None);
    }
    let mut ectx = EvalContext::new();
    for dep in deps {
        let node = &nodes[dep.index()];
        let raw = node.raw.as_ref().ok_or_else(|| WeftError::Build {
            node: node.reference.to_string(),
            cause: "component was never initialized".to_string(),
        })?;
        ectx.bind(node.reference.to_string(), raw.current_state());
    }
    Ok(Some(ectx))
}
