// Tenant context and its ambient propagation for Tessera sessions

pub mod context;
pub mod redact;
pub mod tenant;

pub use context::{current_context, require_context, run_with_context, ContextError};
pub use redact::SecretRedactor;
pub use tenant::{TenantContext, TenantCredentials, TenantError, TenantId};
