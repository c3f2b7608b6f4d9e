//! The `validate` subcommand.

use anyhow::Result;

/// Load the configuration, report diagnostics, and exit.
pub async fn run(file: &str) -> Result<()> {
    let flow = super::load_flow(file).await?;

    let components = flow.node_names().await.len();
    let edges = flow.edges().await.len();
    println!("configuration OK: {components} component(s), {edges} dependency edge(s)");
    Ok(())
}
