//! CLI subcommand implementations.

pub mod convert;
pub mod graph;
pub mod run;
pub mod validate;
pub mod version;

use anyhow::Result;
use std::sync::Arc;
use weft_components::BuiltinRegistry;
use weft_runtime::flow::{Flow, LoadError};

/// Construct a flow over the built-in registry and load it, rendering
/// diagnostics to standard error.
pub async fn load_flow(file: &str) -> Result<Arc<Flow>> {
    let registry = Arc::new(BuiltinRegistry::new());
    let flow = Arc::new(Flow::new(registry, file));

    match flow.load().await {
        Ok(()) => Ok(flow),
        Err(LoadError::Diagnostics(diags)) => {
            for diagnostic in diags.iter() {
                eprintln!("{diagnostic}");
            }
            anyhow::bail!("configuration contains errors")
        }
        Err(LoadError::Fatal(err)) => Err(err.into()),
    }
}
