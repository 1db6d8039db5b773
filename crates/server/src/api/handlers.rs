use super::ApiResult;
use crate::auth::tenant_from_headers;
use crate::config::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tessera_mcp::ServerInstance;

/// One JSON-RPC message against a short-lived server instance for the caller's tenant
pub async fn handle_mcp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Response> {
    let context = tenant_from_headers(&state.config, &headers)?;
    let server = ServerInstance::builder(context)
        .retry_policy(state.config.retry)
        .build()?;

    let session = server.new_session();
    let reply = session.handle_message(&body).await;
    session.close();
    server.stop().await;

    Ok(match reply {
        Some(reply) => ([(header::CONTENT_TYPE, "application/json")], reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    })
}
