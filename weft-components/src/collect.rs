//! A component gathering several inputs into one sequence.

use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use weft_core::block::BlockDefinition;
use weft_core::component::{BuildContext, Component, ComponentFuture, Notifier};
use weft_core::error::Result;
use weft_core::eval::EvalContext;
use weft_core::value::Value;

#[derive(Debug, Deserialize)]
struct CollectConfig {
    inputs: Vec<serde_json::Value>,
}

/// `collect "name" { inputs = [<expr>, ..] }` — exports `{ out: [..] }` of
/// every evaluated input; notifies when the sequence changed.
///
/// Pairs naturally with `concat`:
///
/// ```yaml
/// - kind: collect
///   labels: [all]
///   body:
///     inputs: ${concat(feed.a.out, feed.b.out)}
/// ```
pub struct Collect {
    state: Mutex<Value>,
    notifier: Mutex<Option<Notifier>>,
}

impl Collect {
    /// Build from a block.
    pub fn build(bctx: &BuildContext, block: &BlockDefinition) -> Result<Arc<dyn Component>> {
        let config: CollectConfig = block.decode(bctx.eval())?;
        Ok(Arc::new(Self {
            state: Mutex::new(Self::export(config)),
            notifier: Mutex::new(None),
        }))
    }

    fn export(config: CollectConfig) -> Value {
        Value::record([("out", Value(serde_json::Value::Array(config.inputs)))])
    }
}

impl Component for Collect {
    fn run<'a>(&'a self, shutdown: CancellationToken, notifier: Notifier) -> ComponentFuture<'a> {
        Box::pin(async move {
            *self.notifier.lock().unwrap() = Some(notifier);
            shutdown.cancelled().await;
            Ok(())
        })
    }

    fn update(&self, ectx: Option<&EvalContext>, block: &BlockDefinition) -> Result<()> {
        let config: CollectConfig = block.decode(ectx)?;
        let next = Self::export(config);

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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(yaml: &str) -> BlockDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn gathers_literal_inputs() {
        let bctx = BuildContext::new("collect.all", None);
        let b = block("kind: collect\nlabels: [all]\nbody:\n  inputs: [1, 2, 3]");
        let component = Collect::build(&bctx, &b).unwrap();
        assert_eq!(component.current_state(), Value(json!({"out": [1, 2, 3]})));
    }

    #[test]
    fn gathers_concat_results() {
        let mut ectx = EvalContext::new();
        ectx.bind("feed.a", Value(json!({"out": [1]})));
        ectx.bind("feed.b", Value(json!({"out": [2, 3]})));
        ectx.install_builtins();

        let bctx = BuildContext::new("collect.all", Some(ectx));
        let b = block(
            "kind: collect\nlabels: [all]\nbody:\n  inputs: ${concat(feed.a.out, feed.b.out)}",
        );
        let component = Collect::build(&bctx, &b).unwrap();
        assert_eq!(component.current_state(), Value(json!({"out": [1, 2, 3]})));
    }

    #[test]
    fn non_sequence_inputs_are_rejected() {
        let bctx = BuildContext::new("collect.all", None);
        let b = block("kind: collect\nlabels: [all]\nbody:\n  inputs: scalar");
        assert!(Collect::build(&bctx, &b).is_err());
    }
}
