//! A component that exports a counter on an interval.

use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use weft_core::block::BlockDefinition;
use weft_core::component::{BuildContext, Component, ComponentFuture, Notifier};
use weft_core::error::Result;
use weft_core::eval::EvalContext;
use weft_core::value::Value;

#[derive(Debug, Deserialize)]
struct TickerConfig {
    interval_ms: u64,
}

/// `ticker "name" { interval_ms = N }` — exports `{ out: tick-count }`,
/// notifying on every tick. An updated interval applies from the next tick.
pub struct Ticker {
    interval_ms: AtomicU64,
    count: AtomicU64,
    state: Mutex<Value>,
}

impl Ticker {
    /// Build from a block.
    pub fn build(bctx: &BuildContext, block: &BlockDefinition) -> Result<Arc<dyn Component>> {
        let config: TickerConfig = block.decode(bctx.eval())?;
        Ok(Arc::new(Self {
            interval_ms: AtomicU64::new(config.interval_ms),
            count: AtomicU64::new(0),
            state: Mutex::new(Value::record([("out", Value::int(0))])),
        }))
    }
}

impl Component for Ticker {
    fn run<'a>(&'a self, shutdown: CancellationToken, notifier: Notifier) -> ComponentFuture<'a> {
        Box::pin(async move {
            loop {
                let interval = Duration::from_millis(self.interval_ms.load(Ordering::Relaxed));
                tokio::select! {
                    _ = shutdown.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(interval) => {
                        let count = self.count.fetch_add(1, Ordering::Relaxed) + 1;
                        // State is exported before the notification fires.
                        *self.state.lock().unwrap() =
                            Value::record([("out", Value::int(count as i64))]);
                        notifier.notify();
                    }
                }
            }
        })
    }

    fn update(&self, ectx: Option<&EvalContext>, block: &BlockDefinition) -> Result<()> {
        let config: TickerConfig = block.decode(ectx)?;
        self.interval_ms.store(config.interval_ms, Ordering::Relaxed);
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
    use tokio::sync::mpsc;

    fn block(yaml: &str) -> BlockDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn starts_at_zero() {
        let bctx = BuildContext::new("ticker.t", None);
        let b = block("kind: ticker\nlabels: [t]\nbody:\n  interval_ms: 50");
        let component = Ticker::build(&bctx, &b).unwrap();
        assert_eq!(component.current_state(), Value(json!({"out": 0})));
    }

    #[tokio::test]
    async fn ticks_and_notifies() {
        let bctx = BuildContext::new("ticker.t", None);
        let b = block("kind: ticker\nlabels: [t]\nbody:\n  interval_ms: 5");
        let component = Ticker::build(&bctx, &b).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(move || {
            let _ = tx.send(());
        });

        let token = CancellationToken::new();
        let runner = {
            let token = token.clone();
            let component = Arc::clone(&component);
            tokio::spawn(async move { component.run(token, notifier).await })
        };

        rx.recv().await.expect("first tick");
        rx.recv().await.expect("second tick");
        let state = component.current_state();
        let out = state.get_path(&["out".to_string()]).unwrap();
        assert!(out.inner().as_i64().unwrap() >= 2);

        token.cancel();
        runner.await.unwrap().unwrap();
    }

    #[test]
    fn update_changes_the_interval() {
        let bctx = BuildContext::new("ticker.t", None);
        let b = block("kind: ticker\nlabels: [t]\nbody:\n  interval_ms: 50");
        let component = Ticker::build(&bctx, &b).unwrap();

        let faster = block("kind: ticker\nlabels: [t]\nbody:\n  interval_ms: 10");
        component.update(None, &faster).unwrap();
    }
}
