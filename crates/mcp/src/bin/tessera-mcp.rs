// Standalone MCP server over stdin/stdout

use anyhow::{Context, Result};
use tessera_core::tenant::{TenantContext, TenantCredentials};
use tessera_mcp::{attach_stdio, ServerInstance, StdioStreams};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let credentials = TenantCredentials::from_env().context("Failed to read tenant credentials")?;
    let context = TenantContext::new(credentials).context("Invalid tenant credentials")?;

    let server = ServerInstance::new(context).context("Failed to create server instance")?;
    tracing::info!(
        space_id = server.context().space_id(),
        environment_id = server.context().environment_id(),
        tools = server.list_tools().len(),
        "Tessera MCP server starting"
    );

    let detach = attach_stdio(&server, StdioStreams::process())
        .await
        .context("Failed to attach stdio transport")?;

    tokio::select! {
        _ = detach.closed() => tracing::info!("Input closed"),
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted");
        }
    }

    detach.detach().await;
    server.stop().await;

    Ok(())
}
