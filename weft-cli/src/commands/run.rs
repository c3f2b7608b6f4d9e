//! The `run` subcommand.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use weft_runtime::api::{ApiServer, ServerConfig};

/// Load the configuration and run its components until Ctrl-C.
pub async fn run(file: &str, listen: Option<&str>) -> Result<()> {
    let flow = super::load_flow(file).await?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    if let Some(addr) = listen {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid listen address '{addr}'"))?;
        let server = ApiServer::new(
            ServerConfig::new(addr.ip().to_string(), addr.port()),
            flow.clone(),
        );
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = server.run(shutdown).await {
                tracing::error!(error = %err, "visualization server failed");
            }
        });
    }

    flow.run(shutdown).await?;
    Ok(())
}
