//! HTTP transport seam.
//!
//! The request layer talks to the network through [`HttpTransport`] so the
//! concurrency-sensitive paths can be exercised against scripted responses.
//! Production traffic goes through [`ReqwestTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use super::errors::RequestError;

/// A single outbound HTTP call, fully described.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: reqwest::Method,
    pub url: String,
    /// Applied in order; a later value for the same header name replaces an
    /// earlier one.
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

/// Raw response: status plus the full body read as text, so empty bodies are
/// as unremarkable as JSON ones.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)] // Allow non-Send futures for WASM compatibility
pub trait HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

pub type SharedTransport = Arc<dyn HttpTransport>;

/// Production transport over `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http_client: {
                Client::builder()
                    .user_agent("workhub-dashboard/1.0")
                    .build()
                    .expect("Failed to create HTTP client")
            },
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        // insert, not append: the last writer for a header name wins
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &request.headers {
            match reqwest::header::HeaderName::from_bytes(name.as_bytes()) {
                Ok(header_name) => match reqwest::header::HeaderValue::from_str(value) {
                    Ok(header_value) => {
                        headers.insert(header_name, header_value);
                    }
                    Err(_) => warn!("skipping header {} with unencodable value", name),
                },
                Err(_) => warn!("skipping invalid header name {}", name),
            }
        }

        let mut builder = self
            .http_client
            .request(request.method.clone(), &request.url);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        // applied after the body so these replace anything the body encoding
        // set for the same names
        let response = builder
            .headers(headers)
            .send()
            .await
            .map_err(|e| RequestError::NetworkError {
                message: format!("request to {} failed: {}", request.url, e),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::NetworkError {
                message: format!("failed to read response body: {}", e),
            })?;

        Ok(HttpResponse { status, body })
    }
}
