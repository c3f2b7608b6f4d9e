//! A component forwarding one evaluated input.

use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use weft_core::block::BlockDefinition;
use weft_core::component::{BuildContext, Component, ComponentFuture, Notifier};
use weft_core::error::Result;
use weft_core::eval::EvalContext;
use weft_core::value::Value;

#[derive(Debug, Deserialize)]
struct RelayConfig {
    input: serde_json::Value,
}

/// `relay "name" { input = <expr> }` — exports `{ out: input }`, re-evaluated
/// on every update; notifies when the forwarded value actually changed.
pub struct Relay {
    state: Mutex<Value>,
    notifier: Mutex<Option<Notifier>>,
}

impl Relay {
    /// Build from a block.
    pub fn build(bctx: &BuildContext, block: &BlockDefinition) -> Result<Arc<dyn Component>> {
        let config: RelayConfig = block.decode(bctx.eval())?;
        Ok(Arc::new(Self {
            state: Mutex::new(Value::record([("out", Value(config.input))])),
            notifier: Mutex::new(None),
        }))
    }
}

impl Component for Relay {
    fn run<'a>(&'a self, shutdown: CancellationToken, notifier: Notifier) -> ComponentFuture<'a> {
        Box::pin(async move {
            *self.notifier.lock().unwrap() = Some(notifier);
            shutdown.cancelled().await;
            Ok(())
        })
    }

    fn update(&self, ectx: Option<&EvalContext>, block: &BlockDefinition) -> Result<()> {
        let config: RelayConfig = block.decode(ectx)?;
        let next = Value::record([("out", Value(config.input))]);

        let changed = {
            let mut state = self.state.lock().unwrap();
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        };
        if changed {
            if let Some(notifier) = self.notifier.lock().unwrap().as_ref() {
                notifier.notify();
            }
        }
        Ok(())
    }

    fn current_state(&self) -> Value {
        self.state.lock().unwrap().clone()
    }
}
