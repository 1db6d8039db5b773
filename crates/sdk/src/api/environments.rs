//! Environments API endpoints.

use crate::api::Resource;
use crate::client::ContentClient;
use crate::error::{RequestMeta, TesseraResult};

/// Environments API for the client's own environment.
pub struct EnvironmentsApi<'a> {
    client: &'a ContentClient,
}

impl<'a> EnvironmentsApi<'a> {
    pub(crate) fn new(client: &'a ContentClient) -> Self {
        Self { client }
    }

    /// Fetch the environment the client is scoped to.
    pub async fn get(&self) -> TesseraResult<Resource> {
        let environment_id = self.client.environment_id();
        let path = self.client.space_path(&format!("environments/{}", environment_id));

        self.client
            .call(
                RequestMeta::new("get environment").resource("environment", environment_id),
                || self.client.http.get(&path),
            )
            .await
    }
}
