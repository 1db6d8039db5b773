// Tool registry: records tool metadata and owns dispatch

use crate::protocol::ToolSchema;
use crate::session::SessionState;
use crate::tools::clients::ClientCache;
use crate::tools::schema::ParameterSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tessera_core::context::{run_with_context, ContextError};
use tessera_core::tenant::TenantContext;
use tessera_sdk::{ClassifiedError, RetryPolicy};
use tracing::debug;

/// Metadata reported by `tools/list`.
pub type ToolMetadata = ToolSchema;

/// Failure of a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Upstream(#[from] ClassifiedError),
}

impl ToolError {
    pub fn invalid_arguments(error: serde_json::Error) -> Self {
        ToolError::InvalidArguments(error.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Tool name must not be empty")]
    EmptyName,
}

/// Something that can be invoked as a tool.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

#[async_trait::async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        (self.0)(arguments).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn tool_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// A registered handler bound to the registry's tenant and client.
struct ScopedHandler {
    context: Arc<TenantContext>,
    clients: Arc<ClientCache>,
    inner: Arc<dyn ToolHandler>,
}

#[async_trait::async_trait]
impl ToolHandler for ScopedHandler {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let call = self.clients.clone().scope(self.inner.call(arguments));
        run_with_context(self.context.clone(), call).await
    }
}

struct ToolRecord {
    metadata: ToolMetadata,
    handler: Arc<dyn ToolHandler>,
}

/// Tool registry for one server instance.
///
/// Every handler returned from [`ToolRegistry::get_tool_handler`] runs inside
/// the tenant scope the registry was created with.
pub struct ToolRegistry {
    context: Arc<TenantContext>,
    session: Arc<SessionState>,
    clients: Arc<ClientCache>,
    tools: HashMap<String, ToolRecord>,
}

impl ToolRegistry {
    pub fn new(context: Arc<TenantContext>) -> Self {
        Self::with_session(context, Arc::new(SessionState::default()))
    }

    pub fn with_session(context: Arc<TenantContext>, session: Arc<SessionState>) -> Self {
        Self::with_retry_policy(context, session, RetryPolicy::default())
    }

    /// Tools share one content client built with `retry_policy`.
    pub fn with_retry_policy(
        context: Arc<TenantContext>,
        session: Arc<SessionState>,
        retry_policy: RetryPolicy,
    ) -> Self {
        let clients = Arc::new(ClientCache::new(context.clone(), retry_policy));
        Self {
            context,
            session,
            clients,
            tools: HashMap::new(),
        }
    }

    /// Register a tool. The first registration of a name wins.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }

        let metadata = ToolMetadata {
            name: name.clone(),
            description: description.into(),
            input_schema: parameters.normalize(),
        };
        let handler: Arc<dyn ToolHandler> = Arc::new(ScopedHandler {
            context: self.context.clone(),
            clients: self.clients.clone(),
            inner: handler,
        });

        debug!(parent: self.context.span(), tool = %name, "Registered tool");
        self.tools.insert(name, ToolRecord { metadata, handler });
        Ok(())
    }

    /// Get the wrapped handler for a tool.
    pub fn get_tool_handler(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|record| record.handler.clone())
    }

    /// Metadata of every tool, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<_> = self.tools.values().map(|r| r.metadata.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Invoke a tool by name.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let handler = self
            .get_tool_handler(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        handler.call(arguments).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn context(&self) -> &Arc<TenantContext> {
        &self.context
    }

    /// Session flags shared with the owning server instance.
    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn clients(&self) -> &Arc<ClientCache> {
        &self.clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{Field, FieldKind};
    use serde_json::json;
    use tessera_core::context::current_context;
    use tessera_core::tenant::TenantCredentials;

    fn tenant(space: &str) -> Arc<TenantContext> {
        TenantContext::new(TenantCredentials::new("cfpat-0123456789", space)).unwrap()
    }

    fn echo_space() -> Arc<dyn ToolHandler> {
        tool_fn(|_args| async {
            let ctx = current_context().ok_or(ContextError::Missing)?;
            Ok(json!(ctx.space_id()))
        })
    }

    #[tokio::test]
    async fn test_tools_share_one_configured_client() {
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let mut registry = ToolRegistry::with_retry_policy(
            tenant("space-a"),
            Arc::new(SessionState::default()),
            policy,
        );
        registry
            .register(
                "client",
                "Describe the content client",
                ParameterSchema::none(),
                tool_fn(|_| async {
                    let client = crate::tools::clients::current_client()?;
                    Ok(json!({
                        "max_attempts": client.config().retry_policy.max_attempts,
                        "config": client.config() as *const _ as usize,
                    }))
                }),
            )
            .unwrap();

        let first = registry.call("client", json!({})).await.unwrap();
        let second = registry.call("client", json!({})).await.unwrap();

        assert_eq!(first["max_attempts"], 2);
        assert_eq!(first["config"], second["config"]);
        assert_eq!(registry.clients().retry_policy(), policy);
    }

    #[tokio::test]
    async fn test_handler_runs_in_registry_context() {
        let mut registry = ToolRegistry::new(tenant("space-a"));
        registry
            .register("whoami", "Echo the space", ParameterSchema::none(), echo_space())
            .unwrap();

        assert!(current_context().is_none());
        let result = registry.call("whoami", json!({})).await.unwrap();
        assert_eq!(result, json!("space-a"));
        assert!(current_context().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first() {
        let mut registry = ToolRegistry::new(tenant("space-a"));
        registry
            .register("tool", "first", ParameterSchema::none(), tool_fn(|_| async { Ok(json!(1)) }))
            .unwrap();

        let err = registry
            .register("tool", "second", ParameterSchema::none(), tool_fn(|_| async { Ok(json!(2)) }))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(ref name) if name == "tool"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_tools()[0].description, "first");
        assert_eq!(registry.call("tool", json!({})).await.unwrap(), json!(1));
    }

    #[test]
    fn test_list_tools_sorted_with_normalized_schema() {
        let mut registry = ToolRegistry::new(tenant("space-a"));
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(
                    name,
                    "desc",
                    ParameterSchema::Fields(vec![Field::required("id", FieldKind::String, "An id")]),
                    tool_fn(|_| async { Ok(Value::Null) }),
                )
                .unwrap();
        }

        let tools = registry.list_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
        assert_eq!(tools[0].input_schema["required"], json!(["id"]));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new(tenant("space-a"));
        assert!(registry.get_tool_handler("missing").is_none());

        let err = registry.call("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_handler_errors_propagate_unmodified() {
        let mut registry = ToolRegistry::new(tenant("space-a"));
        registry
            .register(
                "fails",
                "Always fails",
                ParameterSchema::Opaque,
                tool_fn(|_| async { Err(ToolError::InvalidArguments("bad".to_string())) }),
            )
            .unwrap();

        let err = registry.call("fails", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid arguments: bad");
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = ToolRegistry::new(tenant("space-a"));
        let err = registry
            .register("", "nameless", ParameterSchema::Opaque, tool_fn(|_| async { Ok(Value::Null) }))
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyName));
    }
}
