//! Assets API endpoints.

use crate::api::{Collection, ListQuery, Resource};
use crate::client::ContentClient;
use crate::error::{RequestMeta, TesseraResult};

/// Assets API for the client's environment.
pub struct AssetsApi<'a> {
    client: &'a ContentClient,
}

impl<'a> AssetsApi<'a> {
    pub(crate) fn new(client: &'a ContentClient) -> Self {
        Self { client }
    }

    fn path(&self, asset_id: &str) -> String {
        self.client.env_path(&format!("assets/{}", asset_id))
    }

    fn meta(action: &str, asset_id: &str) -> RequestMeta {
        RequestMeta::new(action).resource("asset", asset_id)
    }

    /// Get a specific asset by ID.
    pub async fn get(&self, asset_id: &str) -> TesseraResult<Resource> {
        let path = self.path(asset_id);
        self.client
            .call(Self::meta("get asset", asset_id), || self.client.http.get(&path))
            .await
    }

    /// List assets.
    pub async fn list(&self, query: &ListQuery) -> TesseraResult<Collection<Resource>> {
        let path = self.client.env_path("assets");
        self.client
            .call(RequestMeta::new("list assets"), || {
                self.client.http.get_with_query(&path, query)
            })
            .await
    }

    /// Delete an asset.
    pub async fn delete(&self, asset_id: &str) -> TesseraResult<()> {
        let path = self.path(asset_id);
        self.client
            .call(Self::meta("delete asset", asset_id), || {
                self.client.http.delete_no_response(&path, None)
            })
            .await
    }

    /// Publish an asset at `version`.
    pub async fn publish(&self, asset_id: &str, version: u64) -> TesseraResult<Resource> {
        let path = format!("{}/published", self.path(asset_id));
        self.client
            .call(Self::meta("publish asset", asset_id), || {
                self.client.http.put_empty(&path, Some(version))
            })
            .await
    }

    /// Unpublish an asset.
    pub async fn unpublish(&self, asset_id: &str) -> TesseraResult<Resource> {
        let path = format!("{}/published", self.path(asset_id));
        self.client
            .call(Self::meta("unpublish asset", asset_id), || {
                self.client.http.delete(&path, None)
            })
            .await
    }
}
