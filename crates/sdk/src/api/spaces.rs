//! Spaces API endpoints.

use crate::api::Resource;
use crate::client::ContentClient;
use crate::error::{RequestMeta, TesseraResult};

/// Spaces API for the client's own space.
pub struct SpacesApi<'a> {
    client: &'a ContentClient,
}

impl<'a> SpacesApi<'a> {
    pub(crate) fn new(client: &'a ContentClient) -> Self {
        Self { client }
    }

    /// Fetch the space the client is scoped to.
    pub async fn get(&self) -> TesseraResult<Resource> {
        let space_id = self.client.space_id();
        let path = format!("/spaces/{}", space_id);

        self.client
            .call(RequestMeta::new("get space").resource("space", space_id), || {
                self.client.http.get(&path)
            })
            .await
    }
}
