// One content client per registry, shared by every tool call

use crate::tools::registry::ToolError;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tessera_core::context::require_context;
use tessera_core::tenant::TenantContext;
use tessera_sdk::{ContentClient, RetryPolicy, TesseraResult};
use tracing::debug;

tokio::task_local! {
    static SCOPED_CLIENTS: Arc<ClientCache>;
}

/// Lazily built client for one tenant. Clones share the HTTP connection
/// pool and the configuration.
pub struct ClientCache {
    context: Arc<TenantContext>,
    retry_policy: RetryPolicy,
    client: Mutex<Option<ContentClient>>,
}

impl ClientCache {
    pub fn new(context: Arc<TenantContext>, retry_policy: RetryPolicy) -> Self {
        Self {
            context,
            retry_policy,
            client: Mutex::new(None),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// The tenant's client, built on first use.
    pub fn client(&self) -> TesseraResult<ContentClient> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = ContentClient::from_context_with_retry(&self.context, self.retry_policy)?;
        debug!(parent: self.context.span(), "Content client created");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Run `future` with this cache visible to [`current_client`].
    pub(crate) async fn scope<F: Future>(self: Arc<Self>, future: F) -> F::Output {
        SCOPED_CLIENTS.scope(self, future).await
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("tenant", self.context.id())
            .field("retry_policy", &self.retry_policy)
            .field("built", &self.client.lock().is_some())
            .finish()
    }
}

/// Client for the ambient tenant. The registry's cached client is used
/// when the ambient tenant is the one the registry serves; a nested scope
/// for another tenant gets a fresh client with default retries.
pub(crate) fn current_client() -> Result<ContentClient, ToolError> {
    let context = require_context()?;
    let cached = SCOPED_CLIENTS
        .try_with(|cache| Arc::ptr_eq(&cache.context, &context).then(|| cache.client()))
        .ok()
        .flatten();

    match cached {
        Some(client) => Ok(client?),
        None => Ok(ContentClient::from_context(&context)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::context::run_with_context;
    use tessera_core::tenant::TenantCredentials;

    fn context(space: &str) -> Arc<TenantContext> {
        TenantContext::new(TenantCredentials::new("cfpat-0123456789", space)).unwrap()
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_client_is_built_once() {
        let cache = ClientCache::new(context("s1"), policy());

        let first = cache.client().unwrap();
        let second = cache.client().unwrap();

        assert!(std::ptr::eq(first.config(), second.config()));
        assert_eq!(first.config().retry_policy, policy());
    }

    #[tokio::test]
    async fn test_current_client_uses_scoped_cache() {
        let context = context("s1");
        let cache = Arc::new(ClientCache::new(context.clone(), policy()));
        let cached = cache.client().unwrap();

        let client = run_with_context(context, cache.clone().scope(async { current_client() }))
            .await
            .unwrap();

        assert!(std::ptr::eq(client.config(), cached.config()));
        assert_eq!(client.config().retry_policy.max_attempts, 2);
    }

    #[tokio::test]
    async fn test_other_tenant_gets_its_own_client() {
        let cache = Arc::new(ClientCache::new(context("s1"), policy()));

        let client = run_with_context(context("s2"), cache.scope(async { current_client() }))
            .await
            .unwrap();

        assert_eq!(client.space_id(), "s2");
        assert_eq!(client.config().retry_policy, RetryPolicy::default());
    }

    #[test]
    fn test_current_client_outside_scope() {
        assert!(matches!(current_client(), Err(ToolError::Context(_))));
    }
}
