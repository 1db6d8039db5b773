//! Basic SDK usage example.
//!
//! Reads tenant credentials from the environment, fetches the space and
//! lists a few entries.
//!
//! Run with: cargo run --example basic_usage

use tessera_core::tenant::TenantCredentials;
use tessera_sdk::api::ListQuery;
use tessera_sdk::{ContentClient, RetryPolicy, TesseraResult};
use std::time::Duration;

#[tokio::main]
async fn main() -> TesseraResult<()> {
    tracing_subscriber::fmt::init();

    let credentials = TenantCredentials::from_env()
        .map_err(|e| tessera_sdk::ClassifiedError::configuration(e.to_string()))?;

    let client = ContentClient::builder()
        .host(&credentials.host)
        .access_token(credentials.access_token)
        .space_id(credentials.space_id)
        .environment_id(credentials.environment_id)
        .timeout(Duration::from_secs(30))
        .retry_policy(RetryPolicy::default())
        .build()?;

    println!("Fetching space...");
    let space = client.spaces().get().await?;
    println!(
        "Space {} ({})",
        space.id(),
        space.field("name").and_then(|v| v.as_str()).unwrap_or("unnamed")
    );

    println!("\nListing entries...");
    let entries = client.entries().list(&ListQuery::page(5, 0)).await?;
    println!("Found {} entries", entries.total);

    for entry in &entries.items {
        println!("  Entry {} (version {})", entry.id(), entry.sys.current_version());
    }

    Ok(())
}
