//! Locales API endpoints.

use crate::api::{Collection, ListQuery, Resource};
use crate::client::ContentClient;
use crate::error::{RequestMeta, TesseraResult};

/// Locales API for the client's environment.
pub struct LocalesApi<'a> {
    client: &'a ContentClient,
}

impl<'a> LocalesApi<'a> {
    pub(crate) fn new(client: &'a ContentClient) -> Self {
        Self { client }
    }

    fn path(&self, locale_id: &str) -> String {
        self.client.env_path(&format!("locales/{}", locale_id))
    }

    /// Get a specific locale by ID.
    pub async fn get(&self, locale_id: &str) -> TesseraResult<Resource> {
        let path = self.path(locale_id);
        self.client
            .call(RequestMeta::new("get locale").resource("locale", locale_id), || {
                self.client.http.get(&path)
            })
            .await
    }

    /// List locales.
    pub async fn list(&self, query: &ListQuery) -> TesseraResult<Collection<Resource>> {
        let path = self.client.env_path("locales");
        self.client
            .call(RequestMeta::new("list locales"), || {
                self.client.http.get_with_query(&path, query)
            })
            .await
    }

    /// Delete a locale.
    pub async fn delete(&self, locale_id: &str) -> TesseraResult<()> {
        let path = self.path(locale_id);
        self.client
            .call(RequestMeta::new("delete locale").resource("locale", locale_id), || {
                self.client.http.delete_no_response(&path, None)
            })
            .await
    }
}
