//! OpenSearch HTTP client

use std::time::Duration;

use async_trait::async_trait;
use osbench_core::{BulkBody, BulkResponse, QueryResponse, TargetClient, TransportError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ClientConfigError};
use crate::wire::{ClusterInfo, RawBulkResponse, RawSearchResponse};

const NDJSON: &str = "application/x-ndjson";
const MAX_ERROR_BODY: usize = 512;

/// Failure to construct a client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration rejected
    #[error("invalid client configuration: {0}")]
    Config(#[from] ClientConfigError),

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Client for an OpenSearch-compatible cluster
///
/// Holds one pooled `reqwest::Client`; clone it or wrap it in an `Arc` to
/// share it across workers.
#[derive(Clone)]
pub struct OpenSearchClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl OpenSearchClient {
    /// Build a client from a validated configuration
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_size)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .danger_accept_invalid_certs(config.insecure)
            .user_agent(concat!("osbench/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch cluster name and version from the root endpoint
    pub async fn info(&self) -> Result<ClusterInfo, TransportError> {
        let request = self.http.get(self.config.base_url());
        self.send(request).await
    }

    fn endpoint(&self, collection: &str, action: &str) -> String {
        format!("{}/{}/{}", self.config.base_url(), collection, action)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_error(e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "HTTP error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        debug!(
            error = %err,
            is_connect = err.is_connect(),
            is_timeout = err.is_timeout(),
            "HTTP request failed"
        );
        if err.is_timeout() {
            TransportError::Timeout(self.config.request_timeout)
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[async_trait]
impl TargetClient for OpenSearchClient {
    fn name(&self) -> &str {
        "opensearch"
    }

    async fn write_batch(
        &self,
        collection: &str,
        body: &BulkBody,
    ) -> Result<BulkResponse, TransportError> {
        if body.is_empty() {
            return Ok(BulkResponse::default());
        }

        let payload = body
            .to_ndjson()
            .map_err(|e| TransportError::Decode(format!("failed to encode bulk body: {e}")))?;

        let request = self
            .http
            .post(self.endpoint(collection, "_bulk"))
            .query(&[("refresh", "false")])
            .header(reqwest::header::CONTENT_TYPE, NDJSON)
            .body(payload);

        let raw: RawBulkResponse = self.send(request).await?;
        Ok(raw.into())
    }

    async fn query(&self, collection: &str, body: &Value) -> Result<QueryResponse, TransportError> {
        let request = self.http.post(self.endpoint(collection, "_search")).json(body);

        let raw: RawSearchResponse = self.send(request).await?;
        Ok(raw.into())
    }
}

impl std::fmt::Debug for OpenSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSearchClient")
            .field("url", &self.config.url)
            .field("username", &self.config.username)
            .finish()
    }
}
