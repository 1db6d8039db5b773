//! # Tessera SDK
//!
//! Client for a content-management API, built for use inside tenant scopes.
//!
//! Every call goes through [`ContentClient::call`], which runs the request
//! under a [`RetryPolicy`] and returns a [`ClassifiedError`] on failure.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tessera_sdk::{ContentClient, TesseraResult};
//!
//! #[tokio::main]
//! async fn main() -> TesseraResult<()> {
//!     let client = ContentClient::builder()
//!         .access_token("cfpat-your-token")
//!         .space_id("your-space")
//!         .build()?;
//!
//!     let entry = client.entries().get("entry-id").await?;
//!     println!("Entry version: {}", entry.sys.current_version());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Inside a tenant scope
//!
//! ```rust,no_run
//! use tessera_core::context::run_with_context;
//! use tessera_core::tenant::{TenantContext, TenantCredentials};
//! use tessera_sdk::ContentClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tenant = TenantContext::new(TenantCredentials::from_env()?)?;
//!
//! let space = run_with_context(tenant, async {
//!     ContentClient::for_current_context()?.spaces().get().await
//! })
//! .await?;
//! println!("{}", space.id());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod transport;

pub use client::{ContentClient, ContentClientBuilder};
pub use config::{ClientConfig, RetryPolicy};
pub use error::{classify, ClassifiedError, ErrorKind, RequestMeta, TesseraResult, UpstreamError};
pub use retry::with_retry;

pub use tessera_core::tenant::{TenantContext, TenantCredentials};
