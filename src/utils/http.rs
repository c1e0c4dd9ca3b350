//! HTTP client utilities.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::{NativeParams, SourceError};

/// Status and decoded JSON body of one GET request.
///
/// `body` is `Null` for non-2xx responses; their bodies are not inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl JsonResponse {
    /// A response with the given status and body
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP capability the sources depend on.
///
/// Implementations compose `params` into the query string, apply `timeout`
/// to the whole call and decode the body as JSON.
#[async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    async fn get_json(
        &self,
        url: &str,
        params: &NativeParams,
        timeout: Duration,
    ) -> Result<JsonResponse, SourceError>;
}

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn get_json(
        &self,
        url: &str,
        params: &NativeParams,
        timeout: Duration,
    ) -> Result<JsonResponse, SourceError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        tracing::debug!("GET {} -> {}", response.url(), status);

        if !status.is_success() {
            return Ok(JsonResponse::new(status.as_u16(), serde_json::Value::Null));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SourceError::MalformedResponse(format!("{}: {}", url, e)))?;

        Ok(JsonResponse::new(status.as_u16(), body))
    }
}
