use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod auth;
mod config;
mod websocket;

use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(about = "Multi-tenant MCP server for the content management API", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tessera.toml", env = "TESSERA_CONFIG")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "TESSERA_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "TESSERA_HOST")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting Tessera MCP server");

    let config = ServerConfig::load(&args.config)?;

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting API server on {}", addr);

    api::serve(&addr, config).await?;

    Ok(())
}
