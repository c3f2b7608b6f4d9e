//! The component contract and registry traits.
//!
//! The runtime core never knows concrete component types. It consumes a
//! [`Registry`] for block-matching schemas and construction, and drives built
//! components through the [`Component`] trait: a long-lived run loop, an
//! idempotent update when a dependency's state changes, and a state snapshot.

use crate::block::BlockDefinition;
use crate::error::Result;
use crate::eval::EvalContext;
use crate::value::{Shape, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A boxed future for a component's run loop.
pub type ComponentFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Callback a component invokes whenever its exported state changes.
///
/// Cloneable and safe to call from any task. The runtime wires each node's
/// notifier into the coalescing refresh channel.
#[derive(Clone)]
pub struct Notifier(Arc<dyn Fn() + Send + Sync>);

impl Notifier {
    /// Wrap a callback.
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A notifier that discards notifications (for tests and tools).
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Signal that exported state has changed.
    pub fn notify(&self) {
        (self.0)()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Notifier")
    }
}

/// The capability set every component implements.
///
/// All methods take `&self`; components manage their own interior state.
/// `current_state` must be safe to call from other tasks between
/// notifications.
pub trait Component: Send + Sync {
    /// Run until the token is cancelled. Long-lived; must call `notifier`
    /// whenever exported state changes.
    fn run<'a>(&'a self, shutdown: CancellationToken, notifier: Notifier) -> ComponentFuture<'a>;

    /// Re-configure after a dependency's state changed. Idempotent.
    fn update(&self, ectx: Option<&EvalContext>, block: &BlockDefinition) -> Result<()>;

    /// Snapshot of the exported state.
    fn current_state(&self) -> Value;
}

/// Schema for one component kind.
#[derive(Debug, Clone)]
pub struct ComponentSchema {
    /// The kind tag blocks declare (possibly dotted).
    pub kind: String,
    /// Required number of instance labels.
    pub labels: usize,
    /// Shape of the exported state, used to validate traversal suffixes at
    /// load time.
    pub state_shape: Shape,
}

impl ComponentSchema {
    /// Create a schema for a kind with the given label arity.
    pub fn new(kind: impl Into<String>, labels: usize, state_shape: Shape) -> Self {
        Self {
            kind: kind.into(),
            labels,
            state_shape,
        }
    }
}

/// The block-matching schema a registry exposes to the loader.
#[derive(Debug, Clone, Default)]
pub struct RegistrySchema {
    kinds: BTreeMap<String, ComponentSchema>,
}

impl RegistrySchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind.
    pub fn with_kind(mut self, schema: ComponentSchema) -> Self {
        self.kinds.insert(schema.kind.clone(), schema);
        self
    }

    /// Look up a kind.
    pub fn get(&self, kind: &str) -> Option<&ComponentSchema> {
        self.kinds.get(kind)
    }

    /// Iterate over registered kinds in order.
    pub fn kinds(&self) -> impl Iterator<Item = &ComponentSchema> {
        self.kinds.values()
    }
}

/// Context handed to a registry when building one component.
pub struct BuildContext {
    /// Span tagged with the node's name; component logging should nest here.
    pub span: tracing::Span,
    /// Evaluation environment over the node's direct dependencies, or `None`
    /// when the block has no free variables.
    pub eval: Option<EvalContext>,
}

impl BuildContext {
    /// Create a context for the named node.
    pub fn new(node: &str, eval: Option<EvalContext>) -> Self {
        Self {
            span: tracing::info_span!("component", node = %node),
            eval,
        }
    }

    /// The evaluation context, if any dependencies exist.
    pub fn eval(&self) -> Option<&EvalContext> {
        self.eval.as_ref()
    }
}

/// The external component factory consumed by the runtime core.
pub trait Registry: Send + Sync {
    /// The block-matching schema for the loader.
    fn schema(&self) -> RegistrySchema;

    /// Construct and type-check a component from its block.
    fn build(
        &self,
        kind: &str,
        bctx: &BuildContext,
        block: &BlockDefinition,
    ) -> Result<Arc<dyn Component>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_schema_lookup() {
        let schema = RegistrySchema::new()
            .with_kind(ComponentSchema::new("constant", 1, Shape::Any))
            .with_kind(ComponentSchema::new("relay", 1, Shape::Any));

        assert!(schema.get("constant").is_some());
        assert!(schema.get("unknown").is_none());
        assert_eq!(schema.kinds().count(), 2);
    }

    #[test]
    fn notifier_invokes_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let notifier = Notifier::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify();
        notifier.clone().notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
