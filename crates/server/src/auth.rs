// Tenant resolution for inbound requests

use crate::api::ApiError;
use crate::config::ServerConfig;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tessera_core::tenant::{TenantContext, TenantCredentials};

pub const SPACE_ID_HEADER: &str = "x-space-id";
pub const ENVIRONMENT_ID_HEADER: &str = "x-environment-id";

/// Extract the bearer token from the authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Tenant for a JSON-RPC request: bearer token plus space/environment headers.
pub fn tenant_from_headers(
    config: &ServerConfig,
    headers: &HeaderMap,
) -> Result<Arc<TenantContext>, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!("Missing bearer token")))?;
    let space_id = header(headers, SPACE_ID_HEADER).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("Missing {} header", SPACE_ID_HEADER),
        )
    })?;

    tenant(config.credentials(token, space_id, header(headers, ENVIRONMENT_ID_HEADER)))
}

/// Query parameters accepted on the WebSocket endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    pub token: Option<String>,
    pub space_id: Option<String>,
    pub environment_id: Option<String>,
}

pub fn tenant_from_query(
    config: &ServerConfig,
    query: TenantQuery,
) -> Result<Arc<TenantContext>, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!("Missing token")))?;
    let space_id = query.space_id.filter(|s| !s.is_empty()).ok_or_else(|| {
        ApiError::new(StatusCode::BAD_REQUEST, anyhow::anyhow!("Missing spaceId"))
    })?;

    tenant(config.credentials(token, space_id, query.environment_id))
}

fn tenant(credentials: TenantCredentials) -> Result<Arc<TenantContext>, ApiError> {
    TenantContext::new(credentials).map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))
}
