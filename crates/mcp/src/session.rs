//! Protocol session: turns JSON-RPC messages into registry calls.

use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo,
    ToolsCapability, JSONRPC_VERSION, LATEST_PROTOCOL_VERSION,
};
use crate::tools::{ToolError, ToolRegistry};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Flags scoped to one server instance, reset when it stops.
#[derive(Debug, Default)]
pub struct SessionState {
    initial_context_loaded: AtomicBool,
}

impl SessionState {
    pub fn initial_context_loaded(&self) -> bool {
        self.initial_context_loaded.load(Ordering::SeqCst)
    }

    pub fn mark_initial_context_loaded(&self) {
        self.initial_context_loaded.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.initial_context_loaded.store(false, Ordering::SeqCst);
    }
}

/// One protocol session, bound to one attached transport.
pub struct McpSession {
    id: String,
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
    instructions: Option<String>,
    closed: AtomicBool,
}

impl McpSession {
    pub fn new(registry: Arc<ToolRegistry>, info: ServerInfo) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            registry,
            info,
            instructions: None,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(session = %self.id, "Protocol session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Handle one framed message. Returns the serialized reply, if any.
    pub async fn handle_message(&self, raw: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.handle_value(value).await?,
            Err(e) => {
                debug!(session = %self.id, error = %e, "Unparseable message");
                JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error())
            }
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(session = %self.id, error = %e, "Failed to serialize response");
                None
            }
        }
    }

    /// Handle one decoded JSON value.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid Request: {}", e)),
            )),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Invalid Request: jsonrpc must be \"2.0\""),
            ));
        }

        if request.method.starts_with("notifications/") {
            debug!(session = %self.id, method = %request.method, "Notification received");
            return None;
        }

        let outcome = if self.is_closed() {
            Err(JsonRpcError::internal_error("Session is closed"))
        } else {
            self.dispatch(&request.method, request.params).await
        };

        if notification {
            return None;
        }

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
        debug!(session = %self.id, method, "Dispatching request");

        match method {
            "initialize" => self.initialize(params),
            "ping" => Ok(Value::Object(Default::default())),
            "tools/list" => to_value(ListToolsResult {
                tools: self.registry.list_tools(),
            }),
            "tools/call" => {
                let params: CallToolParams = parse_params(params)?;
                self.call_tool(&params.name, params.arguments).await
            }
            _ => match method.strip_prefix("tools/") {
                Some(name) if self.registry.contains(name) => self.call_tool(name, params).await,
                _ => Err(JsonRpcError::method_not_found(method)),
            },
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let protocol_version = match params {
            Some(params) => parse_params::<InitializeParams>(Some(params))?.protocol_version,
            None => LATEST_PROTOCOL_VERSION.to_string(),
        };

        to_value(InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        })
    }

    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<Value, JsonRpcError> {
        let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));

        let result = match self.registry.call(name, arguments).await {
            Ok(value) => CallToolResult::from_value(&value),
            Err(ToolError::NotFound(name)) => {
                return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", name)));
            }
            Err(error) => {
                let message = self.registry.context().redactor().redact(&error.to_string());
                debug!(session = %self.id, tool = name, error = %message, "Tool call failed");
                CallToolResult::error(message)
            }
        };

        to_value(result)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_value(value: impl serde::Serialize) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
    use crate::tools::{tool_fn, ParameterSchema};
    use serde_json::json;
    use tessera_core::tenant::{TenantContext, TenantCredentials};

    fn session() -> McpSession {
        let context =
            TenantContext::new(TenantCredentials::new("cfpat-secret-token", "space-a")).unwrap();
        let mut registry = ToolRegistry::new(context);
        registry
            .register(
                "echo",
                "Echo arguments",
                ParameterSchema::Opaque,
                tool_fn(|args| async move { Ok(args) }),
            )
            .unwrap();
        registry
            .register(
                "leaky",
                "Fails with the token in the message",
                ParameterSchema::Opaque,
                tool_fn(|_| async {
                    Err(ToolError::InvalidArguments("token cfpat-secret-token rejected".into()))
                }),
            )
            .unwrap();
        McpSession::new(Arc::new(registry), ServerInfo::default())
    }

    async fn request(session: &McpSession, body: Value) -> Value {
        let reply = session.handle_message(&body.to_string()).await.unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let reply = request(
            &session(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26", "capabilities": {}}}),
        )
        .await;

        assert_eq!(reply["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(reply["result"]["serverInfo"]["name"], "tessera-mcp");
        assert_eq!(reply["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let session = session();

        let list = request(&session, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        assert_eq!(list["result"]["tools"][0]["name"], "echo");
        assert_eq!(list["result"]["tools"][0]["inputSchema"]["type"], "object");

        let call = request(
            &session,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "echo", "arguments": {"x": 1}}}),
        )
        .await;
        let text = call["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), json!({"x": 1}));
        assert!(call["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn test_shorthand_method() {
        let reply = request(
            &session(),
            json!({"jsonrpc": "2.0", "id": "a", "method": "tools/echo", "params": {"y": true}}),
        )
        .await;
        assert_eq!(reply["id"], "a");
        assert!(reply["result"]["content"][0]["text"].as_str().unwrap().contains("\"y\": true"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_redacted_error_result() {
        let reply = request(
            &session(),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "leaky"}}),
        )
        .await;

        assert_eq!(reply["result"]["isError"], true);
        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        assert!(!text.contains("cfpat-secret-token"), "{text}");
        assert!(text.contains("[REDACTED]"), "{text}");
    }

    #[tokio::test]
    async fn test_error_codes() {
        let session = session();

        let parse = session.handle_message("{not json").await.unwrap();
        assert_eq!(serde_json::from_str::<Value>(&parse).unwrap()["error"]["code"], PARSE_ERROR);

        let invalid = request(&session, json!({"jsonrpc": "1.0", "id": 1, "method": "ping"})).await;
        assert_eq!(invalid["error"]["code"], INVALID_REQUEST);

        let missing = request(&session, json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"})).await;
        assert_eq!(missing["error"]["code"], METHOD_NOT_FOUND);

        let unknown = request(
            &session,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "nope"}}),
        )
        .await;
        assert_eq!(unknown["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let session = session();
        assert!(session
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(session
            .handle_message(r#"{"jsonrpc":"2.0","method":"ping"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_requests() {
        let session = session();
        session.close();
        assert!(session.is_closed());

        let reply = request(&session, json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})).await;
        assert_eq!(reply["error"]["code"], INTERNAL_ERROR);
    }

    #[test]
    fn test_session_state_reset() {
        let state = SessionState::default();
        assert!(!state.initial_context_loaded());
        state.mark_initial_context_loaded();
        assert!(state.initial_context_loaded());
        state.reset();
        assert!(!state.initial_context_loaded());
    }
}
