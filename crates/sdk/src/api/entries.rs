//! Entries API endpoints.

use crate::api::{Collection, ListQuery, Resource};
use crate::client::ContentClient;
use crate::error::{RequestMeta, TesseraResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entries API for the client's environment.
pub struct EntriesApi<'a> {
    client: &'a ContentClient,
}

impl<'a> EntriesApi<'a> {
    pub(crate) fn new(client: &'a ContentClient) -> Self {
        Self { client }
    }

    fn path(&self, entry_id: &str) -> String {
        self.client.env_path(&format!("entries/{}", entry_id))
    }

    fn meta(action: &str, entry_id: &str) -> RequestMeta {
        RequestMeta::new(action).resource("entry", entry_id)
    }

    /// Get a specific entry by ID.
    pub async fn get(&self, entry_id: &str) -> TesseraResult<Resource> {
        let path = self.path(entry_id);
        self.client
            .call(Self::meta("get entry", entry_id), || self.client.http.get(&path))
            .await
    }

    /// List entries.
    pub async fn list(&self, query: &ListQuery) -> TesseraResult<Collection<Resource>> {
        let path = self.client.env_path("entries");
        self.client
            .call(RequestMeta::new("list entries"), || {
                self.client.http.get_with_query(&path, query)
            })
            .await
    }

    /// Create an entry of the given content type.
    pub async fn create(&self, content_type_id: &str, fields: &EntryFields) -> TesseraResult<Resource> {
        let path = self.client.env_path("entries");
        self.client
            .call(
                RequestMeta::new("create entry").resource("content type", content_type_id),
                || self.client.http.post(&path, fields, Some(content_type_id)),
            )
            .await
    }

    /// Replace the fields of an entry. `version` must be the entry's current version.
    pub async fn update(&self, entry_id: &str, version: u64, fields: &EntryFields) -> TesseraResult<Resource> {
        let path = self.path(entry_id);
        self.client
            .call(Self::meta("update entry", entry_id), || {
                self.client.http.put(&path, fields, Some(version))
            })
            .await
    }

    /// Delete an entry.
    pub async fn delete(&self, entry_id: &str) -> TesseraResult<()> {
        let path = self.path(entry_id);
        self.client
            .call(Self::meta("delete entry", entry_id), || {
                self.client.http.delete_no_response(&path, None)
            })
            .await
    }

    /// Publish an entry at `version`.
    pub async fn publish(&self, entry_id: &str, version: u64) -> TesseraResult<Resource> {
        let path = format!("{}/published", self.path(entry_id));
        self.client
            .call(Self::meta("publish entry", entry_id), || {
                self.client.http.put_empty(&path, Some(version))
            })
            .await
    }

    /// Unpublish an entry.
    pub async fn unpublish(&self, entry_id: &str) -> TesseraResult<Resource> {
        let path = format!("{}/published", self.path(entry_id));
        self.client
            .call(Self::meta("unpublish entry", entry_id), || {
                self.client.http.delete(&path, None)
            })
            .await
    }
}

/// Body for creating or updating an entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFields {
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter_ratio: 0.0,
        }
    }

    fn client(server: &MockServer) -> ContentClient {
        ContentClient::builder()
            .base_url(server.uri())
            .access_token("cfpat-test-token")
            .space_id("s1")
            .retry_policy(fast_policy())
            .build()
            .unwrap()
    }

    fn entry_body(id: &str, version: u64) -> Value {
        json!({"sys": {"id": id, "type": "Entry", "version": version}, "fields": {}})
    }

    #[tokio::test]
    async fn test_get_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/s1/environments/master/entries/e1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(entry_body("e1", 4)))
            .mount(&server)
            .await;

        let entry = client(&server).entries().get("e1").await.unwrap();
        assert_eq!(entry.id(), "e1");
        assert_eq!(entry.sys.version, Some(4));
    }

    #[tokio::test]
    async fn test_get_entry_retries_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/s1/environments/master/entries/e1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/spaces/s1/environments/master/entries/e1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(entry_body("e1", 1)))
            .expect(1)
            .mount(&server)
            .await;

        let entry = client(&server).entries().get("e1").await.unwrap();
        assert_eq!(entry.id(), "e1");
    }

    #[tokio::test]
    async fn test_not_found_is_classified_with_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/s1/environments/master/entries/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "sys": {"type": "Error", "id": "NotFound"},
                "message": "The resource could not be found."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let error = client(&server).entries().get("missing").await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);
        assert!(!error.retryable);

        let rendered = error.to_string();
        assert!(rendered.contains("get entry"), "{rendered}");
        assert!(rendered.contains("missing"), "{rendered}");
    }

    #[tokio::test]
    async fn test_publish_sends_version() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/spaces/s1/environments/master/entries/e1/published"))
            .and(header("x-contentful-version", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(entry_body("e1", 6)))
            .expect(1)
            .mount(&server)
            .await;

        let entry = client(&server).entries().publish("e1", 5).await.unwrap();
        assert_eq!(entry.sys.version, Some(6));
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/spaces/s1/environments/master/entries/e1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "sys": {"type": "Error", "id": "VersionMismatch"},
                "message": "Version mismatch"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let error = client(&server)
            .entries()
            .update("e1", 2, &EntryFields::default())
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Conflict);
        assert_eq!(error.status, Some(409));
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/spaces/s1/environments/master/entries/e1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).entries().delete("e1").await.unwrap();
    }
}
