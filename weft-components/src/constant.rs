//! A component exporting a fixed value.

use serde::Deserialize;
use std::sync::{Arc, Mutex};
use weft_core::block::BlockDefinition;
use weft_core::component::{BuildContext, Component, ComponentFuture, Notifier};
use weft_core::error::Result;
use weft_core::eval::EvalContext;
use weft_core::value::Value;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
struct ConstantConfig {
    value: serde_json::Value,
}

/// `constant "name" { value = .. }` — exports `{ out: value }` and never
/// notifies after startup.
pub struct Constant {
    state: Mutex<Value>,
}

impl Constant {
    /// Build from a block.
    pub fn build(bctx: &BuildContext, block: &BlockDefinition) -> Result<Arc<dyn Component>> {
        let config: ConstantConfig = block.decode(bctx.eval())?;
        Ok(Arc::new(Self {
            state: Mutex::new(Self::export(config)),
        }))
    }

    fn export(config: ConstantConfig) -> Value {
        Value::record([("out", Value(config.value))])
    }
}

impl Component for Constant {
    fn run<'a>(&'a self, shutdown: CancellationToken, _notifier: Notifier) -> ComponentFuture<'a> {
        Box::pin(async move {
            shutdown.cancelled().await;
            Ok(())
        })
    }

    fn update(&self, ectx: Option<&EvalContext>, block: &BlockDefinition) -> Result<()> {
        let config: ConstantConfig = block.decode(ectx)?;
        *self.state.lock().unwrap() = Self::export(config);
        Ok(())
    }

    fn current_state(&self) -> Value {
        self.state.lock().unwrap().clone()
    }
}
