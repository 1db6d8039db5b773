// Health check tool

use crate::tools::{client, success, tool_fn, ParameterSchema, RegistryError, ToolError, ToolRegistry};
use serde_json::{json, Value};

pub(crate) fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "ping",
        "Check that the tenant credentials are valid and the content API is reachable",
        ParameterSchema::none(),
        tool_fn(ping),
    )
}

async fn ping(_arguments: Value) -> Result<Value, ToolError> {
    let client = client()?;
    let space = client.spaces().get().await?;

    Ok(success(
        "Ping successful",
        json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "space": {
                "id": space.id(),
                "name": space.field("name"),
            },
            "environment": client.environment_id(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::tenant_for;
    use tessera_sdk::ErrorKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ping_reports_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/space-a"))
            .and(header("Authorization", "Bearer cfpat-0123456789"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sys": {"id": "space-a", "type": "Space"},
                "name": "Marketing"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut registry = ToolRegistry::new(tenant_for(&server, "space-a"));
        register(&mut registry).unwrap();

        let result = registry.call("ping", json!({})).await.unwrap();
        assert_eq!(result["status"], "healthy");
        assert_eq!(result["space"], json!({"id": "space-a", "name": "Marketing"}));
        assert_eq!(result["environment"], "master");
    }

    #[tokio::test]
    async fn test_ping_surfaces_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/space-a"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "sys": {"type": "Error", "id": "AccessTokenInvalid"},
                "message": "The access token you sent could not be found or is invalid."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut registry = ToolRegistry::new(tenant_for(&server, "space-a"));
        register(&mut registry).unwrap();

        match registry.call("ping", json!({})).await {
            Err(ToolError::Upstream(error)) => {
                assert_eq!(error.kind, ErrorKind::AuthenticationOrPermission);
                assert!(!error.retryable);
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ping_honours_configured_retry_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/space-a"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let policy = tessera_sdk::RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
            max_delay_ms: 1,
            jitter_ratio: 0.0,
        };
        let mut registry = ToolRegistry::with_retry_policy(
            tenant_for(&server, "space-a"),
            std::sync::Arc::new(crate::session::SessionState::default()),
            policy,
        );
        register(&mut registry).unwrap();

        match registry.call("ping", json!({})).await {
            Err(ToolError::Upstream(error)) => {
                assert_eq!(error.kind, ErrorKind::UpstreamServiceError);
                assert_eq!(error.status, Some(503));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
