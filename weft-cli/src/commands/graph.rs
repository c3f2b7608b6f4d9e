//! The `graph` subcommand.

use anyhow::Result;

/// Print the dependency graph (or the nametable) as DOT text.
pub async fn run(file: &str, nametable: bool) -> Result<()> {
    let flow = super::load_flow(file).await?;

    let dot = if nametable {
        flow.nametable_dot().await
    } else {
        flow.graph_dot().await
    };
    print!("{dot}");
    Ok(())
}
