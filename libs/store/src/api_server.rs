//! HTTP backend for a Kubernetes-style API server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::debug;

use crate::error::StoreError;
use crate::object::DynamicObject;
use crate::resource::ApiResource;
use crate::ObjectStore;

/// Connection settings for [`ApiServerStore`].
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Base URL of the API server.
    pub api_url: String,

    /// Bearer token, if the server requires one.
    pub token: Option<String>,

    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiServerConfig {
    /// Settings for an unauthenticated server with a 30 second timeout.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: None,
            accept_invalid_certs: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`ObjectStore`] backed by an API server's REST interface.
#[derive(Debug, Clone)]
pub struct ApiServerStore {
    client: reqwest::Client,
    base_url: String,
}

impl ApiServerStore {
    /// Create a client for the configured server.
    pub fn new(config: &ApiServerConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| StoreError::InvalidRequest("invalid token format".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a successful response into an object.
    async fn read_object(response: reqwest::Response) -> Result<DynamicObject, StoreError> {
        let body = response.bytes().await?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| StoreError::Decode(e.to_string()))?;
        DynamicObject::from_value(value)
    }

    /// Turn an error response into a [`StoreError`].
    async fn read_error(response: reqwest::Response, resource: &ApiResource, name: &str) -> StoreError {
        let status = response.status().as_u16();

        // The server normally answers with a Status object; fall back to the
        // raw body when it does not.
        let body = response.text().await.unwrap_or_default();
        let (reason, message) = match serde_json::from_str::<StatusBody>(&body) {
            Ok(status_body) => (status_body.reason, status_body.message),
            Err(_) => (String::new(), body),
        };

        StoreError::from_status(status, reason, message, &resource.to_string(), name)
    }
}

/// Subset of the API server's Status object.
#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl ObjectStore for ApiServerStore {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        let url = self.url(&resource.path(namespace, Some(name))?);
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Self::read_object(response).await
        } else {
            Err(Self::read_error(response, resource, name).await)
        }
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        let name = object.name().unwrap_or_default().to_string();
        let url = self.url(&resource.path(namespace, None)?);
        debug!(%url, name = %name, "POST");

        let response = self.client.post(&url).json(object).send().await?;
        if response.status().is_success() {
            Self::read_object(response).await
        } else {
            Err(Self::read_error(response, resource, &name).await)
        }
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError> {
        let url = self.url(&resource.path(namespace, Some(name))?);
        debug!(%url, "DELETE");

        let response = self.client.delete(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(response, resource, name).await)
        }
    }
}
