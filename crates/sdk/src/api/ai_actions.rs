//! AI actions and AI action invocations.
//!
//! Actions live at the space level; invocations are scoped to an
//! environment.

use crate::api::{Collection, ListQuery, Resource};
use crate::client::ContentClient;
use crate::error::{RequestMeta, TesseraResult};

/// AI actions API for the client's space.
pub struct AiActionsApi<'a> {
    client: &'a ContentClient,
}

impl<'a> AiActionsApi<'a> {
    pub(crate) fn new(client: &'a ContentClient) -> Self {
        Self { client }
    }

    fn path(&self, action_id: &str) -> String {
        self.client.space_path(&format!("ai/actions/{}", action_id))
    }

    fn meta(action: &str, action_id: &str) -> RequestMeta {
        RequestMeta::new(action).resource("AI action", action_id)
    }

    /// Get a specific AI action by ID.
    pub async fn get(&self, action_id: &str) -> TesseraResult<Resource> {
        let path = self.path(action_id);
        self.client
            .call(Self::meta("get AI action", action_id), || self.client.http.get(&path))
            .await
    }

    /// List AI actions.
    pub async fn list(&self, query: &ListQuery) -> TesseraResult<Collection<Resource>> {
        let path = self.client.space_path("ai/actions");
        self.client
            .call(RequestMeta::new("list AI actions"), || {
                self.client.http.get_with_query(&path, query)
            })
            .await
    }

    /// Delete an AI action.
    pub async fn delete(&self, action_id: &str) -> TesseraResult<()> {
        let path = self.path(action_id);
        self.client
            .call(Self::meta("delete AI action", action_id), || {
                self.client.http.delete_no_response(&path, None)
            })
            .await
    }

    /// Publish an AI action at `version`.
    pub async fn publish(&self, action_id: &str, version: u64) -> TesseraResult<Resource> {
        let path = format!("{}/published", self.path(action_id));
        self.client
            .call(Self::meta("publish AI action", action_id), || {
                self.client.http.put_empty(&path, Some(version))
            })
            .await
    }

    /// Unpublish an AI action.
    pub async fn unpublish(&self, action_id: &str) -> TesseraResult<Resource> {
        let path = format!("{}/published", self.path(action_id));
        self.client
            .call(Self::meta("unpublish AI action", action_id), || {
                self.client.http.delete(&path, None)
            })
            .await
    }
}

/// AI action invocations API for the client's environment.
pub struct AiActionInvocationsApi<'a> {
    client: &'a ContentClient,
}

impl<'a> AiActionInvocationsApi<'a> {
    pub(crate) fn new(client: &'a ContentClient) -> Self {
        Self { client }
    }

    /// Get the result of one invocation of an AI action.
    pub async fn get(&self, action_id: &str, invocation_id: &str) -> TesseraResult<Resource> {
        let path = self.client.env_path(&format!(
            "ai/actions/{}/invocations/{}",
            action_id, invocation_id
        ));
        self.client
            .call(
                RequestMeta::new("get AI action invocation")
                    .resource("AI action invocation", invocation_id),
                || self.client.http.get(&path),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ContentClient {
        ContentClient::builder()
            .base_url(server.uri())
            .space_id("s1")
            .environment_id("dev")
            .retry_policy(RetryPolicy::no_retry())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_ai_action_is_space_scoped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/s1/ai/actions/a1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"sys": {"id": "a1", "type": "AiAction"}, "name": "Translate"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let action = client(&server).ai_actions().get("a1").await.unwrap();
        assert_eq!(action.field("name"), Some(&json!("Translate")));
    }

    #[tokio::test]
    async fn test_invocation_is_environment_scoped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/s1/environments/dev/ai/actions/a1/invocations/i1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"sys": {"id": "i1", "type": "AiActionInvocation"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let invocation = client(&server)
            .ai_action_invocations()
            .get("a1", "i1")
            .await
            .unwrap();
        assert_eq!(invocation.id(), "i1");
    }
}
