//! HTTP transport layer for the Tessera SDK.
//!
//! Single attempts only; retries are applied one level up by
//! [`crate::client::ContentClient::call`].

use crate::config::{ClientConfig, USER_AGENT_TOOL};
use crate::error::UpstreamError;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::debug;

const VERSION_HEADER: &str = "x-contentful-version";
const CONTENT_TYPE_HEADER: &str = "x-contentful-content-type";
const USER_AGENT_TOOL_HEADER: &str = "x-contentful-user-agent-tool";

/// HTTP transport for making API requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, UpstreamError> {
        let mut headers = header::HeaderMap::new();

        if let Some(ref token) = config.access_token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| UpstreamError::Config("Invalid access token format".to_string()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        headers.insert(
            header::HeaderName::from_static(USER_AGENT_TOOL_HEADER),
            header::HeaderValue::from_static(USER_AGENT_TOOL),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Build a URL for the given path.
    fn build_url(&self, path: &str) -> Result<url::Url, UpstreamError> {
        Ok(self.config.base_url.join(path)?)
    }

    /// Send once; non-success statuses become [`UpstreamError::Api`].
    async fn execute(&self, request_builder: RequestBuilder) -> Result<Response, UpstreamError> {
        let response = request_builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::from_response(status.as_u16(), &body))
    }

    fn versioned(request: RequestBuilder, version: Option<u64>) -> RequestBuilder {
        match version {
            Some(version) => request.header(VERSION_HEADER, version),
            None => request,
        }
    }

    /// Execute a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request");

        let response = self.execute(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    /// Execute a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, UpstreamError> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request with query");

        let response = self.execute(self.client.get(url).query(query)).await?;
        Ok(response.json().await?)
    }

    /// Execute a POST request, optionally naming the content type of a new entry.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        content_type_id: Option<&str>,
    ) -> Result<T, UpstreamError> {
        let url = self.build_url(path)?;
        debug!(url = %url, "POST request");

        let mut request = self.client.post(url).json(body);
        if let Some(content_type_id) = content_type_id {
            request = request.header(CONTENT_TYPE_HEADER, content_type_id);
        }

        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    /// Execute a PUT request carrying a body.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        version: Option<u64>,
    ) -> Result<T, UpstreamError> {
        let url = self.build_url(path)?;
        debug!(url = %url, ?version, "PUT request");

        let request = Self::versioned(self.client.put(url).json(body), version);
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    /// Execute a PUT request without a body (publish endpoints).
    pub async fn put_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        version: Option<u64>,
    ) -> Result<T, UpstreamError> {
        let url = self.build_url(path)?;
        debug!(url = %url, ?version, "PUT request (empty body)");

        let response = self.execute(Self::versioned(self.client.put(url), version)).await?;
        Ok(response.json().await?)
    }

    /// Execute a DELETE request that returns the updated resource.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        version: Option<u64>,
    ) -> Result<T, UpstreamError> {
        let url = self.build_url(path)?;
        debug!(url = %url, "DELETE request");

        let response = self.execute(Self::versioned(self.client.delete(url), version)).await?;
        Ok(response.json().await?)
    }

    /// Execute a DELETE request without a response body.
    pub async fn delete_no_response(&self, path: &str, version: Option<u64>) -> Result<(), UpstreamError> {
        let url = self.build_url(path)?;
        debug!(url = %url, "DELETE request (no response)");

        self.execute(Self::versioned(self.client.delete(url), version)).await?;
        Ok(())
    }
}
