//! Instrumented components for exercising the runtime in tests.

use crate::block::BlockDefinition;
use crate::component::{
    BuildContext, Component, ComponentFuture, ComponentSchema, Notifier, Registry, RegistrySchema,
};
use crate::error::Result;
use crate::eval::{self, EvalContext};
use crate::value::{Shape, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct ProbeShared {
    state: Mutex<Value>,
    updates: Mutex<Vec<Value>>,
    update_count: AtomicUsize,
    publish_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

/// A component that exports `{ out: <published value> }` and records every
/// update the runtime delivers to it.
pub struct Probe {
    shared: Arc<ProbeShared>,
}

/// Test-side handle to a [`Probe`].
///
/// Publishing a value makes the probe's run loop export it and fire its
/// notifier, which is how tests drive change propagation.
#[derive(Clone)]
pub struct ProbeHandle {
    shared: Arc<ProbeShared>,
    publish_tx: mpsc::UnboundedSender<Value>,
}

impl ProbeHandle {
    /// Publish a new `out` value; the probe notifies once it has exported it.
    pub fn publish(&self, out: Value) {
        let _ = self.publish_tx.send(out);
    }

    /// The probe's current exported state.
    pub fn state(&self) -> Value {
        self.shared.state.lock().unwrap().clone()
    }

    /// How many updates the runtime has delivered.
    pub fn update_count(&self) -> usize {
        self.shared.update_count.load(Ordering::SeqCst)
    }

    /// The evaluated body captured at each update, in order.
    pub fn updates(&self) -> Vec<Value> {
        self.shared.updates.lock().unwrap().clone()
    }
}

impl Probe {
    fn new(initial: Value) -> (Self, ProbeHandle) {
        let (publish_tx, publish_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(ProbeShared {
            state: Mutex::new(initial),
            updates: Mutex::new(Vec::new()),
            update_count: AtomicUsize::new(0),
            publish_rx: Mutex::new(Some(publish_rx)),
        });
        let handle = ProbeHandle {
            shared: Arc::clone(&shared),
            publish_tx,
        };
        (Self { shared }, handle)
    }
}

impl Component for Probe {
    fn run<'a>(&'a self, shutdown: CancellationToken, notifier: Notifier) -> ComponentFuture<'a> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let rx = shared.publish_rx.lock().unwrap().take();
            let Some(mut rx) = rx else {
                shutdown.cancelled().await;
                return Ok(());
            };

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return Ok(()),
                    published = rx.recv() => {
                        let Some(out) = published else {
                            shutdown.cancelled().await;
                            return Ok(());
                        };
                        // State is exported before the notification fires.
                        *shared.state.lock().unwrap() = Value::record([("out", out)]);
                        notifier.notify();
                    }
                }
            }
        })
    }

    fn update(&self, ectx: Option<&EvalContext>, block: &BlockDefinition) -> Result<()> {
        let evaluated = eval::evaluate(&block.body, ectx)?;
        self.shared.updates.lock().unwrap().push(evaluated);
        self.shared.update_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn current_state(&self) -> Value {
        self.shared.state.lock().unwrap().clone()
    }
}

/// A registry whose every kind builds a [`Probe`].
///
/// Handles are retrievable by reference string after Load, letting tests
/// publish state changes and observe delivered updates.
pub struct ProbeRegistry {
    kinds: Vec<String>,
    handles: Mutex<BTreeMap<String, ProbeHandle>>,
    build_count: AtomicUsize,
}

impl ProbeRegistry {
    /// Create a registry accepting the given kinds, each taking one label.
    pub fn new(kinds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            handles: Mutex::new(BTreeMap::new()),
            build_count: AtomicUsize::new(0),
        }
    }

    /// The handle for a built node, by reference string (e.g. `source.s`).
    pub fn handle(&self, reference: &str) -> Option<ProbeHandle> {
        self.handles.lock().unwrap().get(reference).cloned()
    }

    /// How many components this registry has built.
    pub fn build_count(&self) -> usize {
        self.build_count.load(Ordering::SeqCst)
    }
}

impl Registry for ProbeRegistry {
    fn schema(&self) -> RegistrySchema {
        self.kinds.iter().fold(RegistrySchema::new(), |schema, kind| {
            schema.with_kind(ComponentSchema::new(
                kind,
                1,
                Shape::record([("out", Shape::Any)]),
            ))
        })
    }

    fn build(
        &self,
        _kind: &str,
        bctx: &BuildContext,
        block: &BlockDefinition,
    ) -> Result<Arc<dyn Component>> {
        // Probes tolerate evaluation failures so graph-level behavior can be
        // observed in isolation; real registries type-check strictly.
        let initial = eval::evaluate(&block.body, bctx.eval())
            .ok()
            .and_then(|v| v.get_path(&["value".to_string()]))
            .unwrap_or_else(Value::null);

        let (probe, handle) = Probe::new(Value::record([("out", initial)]));
        self.handles
            .lock()
            .unwrap()
            .insert(block.reference().to_string(), handle);
        self.build_count.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(probe))
    }
}
