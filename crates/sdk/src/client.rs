//! Main client for the Tessera SDK.

use crate::api::*;
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{ClassifiedError, ErrorKind, RequestMeta, TesseraResult, UpstreamError};
use crate::retry::with_retry;
use crate::transport::HttpTransport;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::context::require_context;
use tessera_core::tenant::TenantContext;
use url::Url;

/// Client for the content-management API, scoped to one space and environment.
#[derive(Debug, Clone)]
pub struct ContentClient {
    config: Arc<ClientConfig>,
    pub(crate) http: HttpTransport,
}

impl ContentClient {
    /// Create a new client builder.
    pub fn builder() -> ContentClientBuilder {
        ContentClientBuilder::new()
    }

    fn from_config(config: ClientConfig) -> TesseraResult<Self> {
        let config = Arc::new(config);
        let http = HttpTransport::new(config.clone())?;

        Ok(Self { config, http })
    }

    /// Build a client for the given tenant.
    pub fn from_context(context: &TenantContext) -> TesseraResult<Self> {
        Self::from_context_with_retry(context, RetryPolicy::default())
    }

    /// Build a client for the given tenant with an explicit retry policy.
    pub fn from_context_with_retry(
        context: &TenantContext,
        retry_policy: RetryPolicy,
    ) -> TesseraResult<Self> {
        Self::builder()
            .host(context.host())
            .access_token(context.access_token())
            .space_id(context.space_id())
            .environment_id(context.environment_id())
            .retry_policy(retry_policy)
            .build()
    }

    /// Build a client for the tenant of the ambient scope.
    ///
    /// Fails with a configuration error outside any scope.
    pub fn for_current_context() -> TesseraResult<Self> {
        let context = require_context()
            .map_err(|e| ClassifiedError::new(ErrorKind::Unknown, None, e.to_string()))?;
        Self::from_context(&context)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn space_id(&self) -> &str {
        &self.config.space_id
    }

    pub fn environment_id(&self) -> &str {
        &self.config.environment_id
    }

    /// Run one API operation under the retry policy, tagging a failure with `meta`.
    ///
    /// Every verb in [`crate::api`] goes through here.
    pub async fn call<T, F, Fut>(&self, meta: RequestMeta, operation: F) -> TesseraResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        with_retry(&self.config.retry_policy, operation)
            .await
            .map_err(|error| error.with_meta(meta))
    }

    pub(crate) fn space_path(&self, suffix: &str) -> String {
        format!("/spaces/{}/{}", self.config.space_id, suffix)
    }

    pub(crate) fn env_path(&self, suffix: &str) -> String {
        format!(
            "/spaces/{}/environments/{}/{}",
            self.config.space_id, self.config.environment_id, suffix
        )
    }

    /// Get the spaces API.
    pub fn spaces(&self) -> SpacesApi<'_> {
        SpacesApi::new(self)
    }

    /// Get the environments API.
    pub fn environments(&self) -> EnvironmentsApi<'_> {
        EnvironmentsApi::new(self)
    }

    /// Get the entries API.
    pub fn entries(&self) -> EntriesApi<'_> {
        EntriesApi::new(self)
    }

    /// Get the assets API.
    pub fn assets(&self) -> AssetsApi<'_> {
        AssetsApi::new(self)
    }

    /// Get the locales API.
    pub fn locales(&self) -> LocalesApi<'_> {
        LocalesApi::new(self)
    }

    /// Get the AI actions API.
    pub fn ai_actions(&self) -> AiActionsApi<'_> {
        AiActionsApi::new(self)
    }

    /// Get the AI action invocations API.
    pub fn ai_action_invocations(&self) -> AiActionInvocationsApi<'_> {
        AiActionInvocationsApi::new(self)
    }
}

/// Builder for creating a [`ContentClient`].
pub struct ContentClientBuilder {
    base_url: Option<String>,
    access_token: Option<String>,
    space_id: Option<String>,
    environment_id: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl ContentClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            access_token: None,
            space_id: None,
            environment_id: tessera_core::tenant::DEFAULT_ENVIRONMENT_ID.to_string(),
            timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Set the full base URL (useful for tests against a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API host; the base URL becomes `https://{host}`.
    ///
    /// A host that already carries a scheme is used as the base URL verbatim.
    pub fn host(mut self, host: impl AsRef<str>) -> Self {
        let host = host.as_ref();
        self.base_url = Some(if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        });
        self
    }

    /// Set the bearer token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn space_id(mut self, id: impl Into<String>) -> Self {
        self.space_id = Some(id.into());
        self
    }

    pub fn environment_id(mut self, id: impl Into<String>) -> Self {
        self.environment_id = id.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Build the client.
    pub fn build(self) -> TesseraResult<ContentClient> {
        let base_url = self.base_url.unwrap_or_else(|| {
            format!("https://{}", tessera_core::tenant::DEFAULT_HOST)
        });
        let base_url = Url::parse(&base_url).map_err(UpstreamError::from)?;

        let space_id = self
            .space_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClassifiedError::configuration("space_id is required"))?;

        let config = ClientConfig {
            base_url,
            access_token: self.access_token,
            space_id,
            environment_id: self.environment_id,
            timeout: self.timeout,
            retry_policy: self.retry_policy,
        };

        ContentClient::from_config(config)
    }
}

impl Default for ContentClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
