//! Ambient tenant context.
//!
//! A tenant is bound to a future with [`run_with_context`]; everything that
//! future polls, including work resumed after an `.await`, sees the tenant
//! through [`current_context`]. The binding lives in a tokio task-local, so
//! futures interleaved on the same task or spread over different tasks each
//! observe only their own scope.

use crate::tenant::TenantContext;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

tokio::task_local! {
    static CURRENT_TENANT: Arc<TenantContext>;
}

/// Raised when work that needs a tenant runs outside any tenant scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("Configuration error: no tenant context is active for this call")]
    Missing,
}

/// Run `scope` with `context` as the ambient tenant.
///
/// Nested calls shadow the outer tenant until the inner future completes.
/// The future is also instrumented with the tenant's span.
pub async fn run_with_context<F>(context: Arc<TenantContext>, scope: F) -> F::Output
where
    F: Future,
{
    let span = context.span().clone();
    CURRENT_TENANT.scope(context, scope).instrument(span).await
}

/// Synchronous counterpart of [`run_with_context`].
pub fn sync_scope<R>(context: Arc<TenantContext>, f: impl FnOnce() -> R) -> R {
    let span = context.span().clone();
    let _entered = span.enter();
    CURRENT_TENANT.sync_scope(context, f)
}

/// The tenant bound to the current scope, if any.
pub fn current_context() -> Option<Arc<TenantContext>> {
    CURRENT_TENANT.try_with(Arc::clone).ok()
}

/// Like [`current_context`] but fails instead of returning `None`.
pub fn require_context() -> Result<Arc<TenantContext>, ContextError> {
    current_context().ok_or(ContextError::Missing)
}

/// Spawn a task that inherits the caller's tenant scope.
///
/// `tokio::spawn` starts tasks with empty task-locals; this carries the
/// current binding across. Outside a scope it behaves like `tokio::spawn`.
pub fn spawn_in_current_context<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current_context() {
        Some(context) => tokio::spawn(run_with_context(context, future)),
        None => tokio::spawn(future),
    }
}
