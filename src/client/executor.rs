use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, instrument};

use super::errors::{RequestError, RequestResult};
use super::session::SessionStore;
use super::transport::{HttpRequest, HttpResponse, SharedTransport};

/// Fallback for non-2xx responses whose body carries no usable message.
const REQUEST_FAILED_FALLBACK: &str = "The server could not complete the request";

/// One dashboard API call, captured so it can be replayed verbatim with a
/// different bearer token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, or an absolute URL.
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Extra headers; these win over the generated ones on conflict.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        request
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut request = Self::new(Method::PUT, path);
        request.body = Some(body);
        request
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Sends single HTTP calls with the current access credential attached and
/// normalizes the outcome into a typed result.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: SharedTransport,
    store: Arc<SessionStore>,
    base_url: String,
}

impl RequestExecutor {
    pub fn new(transport: SharedTransport, store: Arc<SessionStore>, base_url: String) -> Self {
        Self {
            transport,
            store,
            base_url,
        }
    }

    /// Send with the access token read from the store at call time.
    #[instrument(skip(self, request), fields(path = %request.path), err)]
    pub async fn execute(&self, request: &ApiRequest) -> RequestResult<serde_json::Value> {
        let token = self.store.load().map(|credentials| credentials.access_token);
        self.dispatch(request, token.as_deref()).await
    }

    /// Send with an explicitly supplied access token, bypassing the store.
    /// Used for replays after a refresh.
    pub async fn execute_with_token(
        &self,
        request: &ApiRequest,
        access_token: &str,
    ) -> RequestResult<serde_json::Value> {
        self.dispatch(request, Some(access_token)).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> RequestResult<serde_json::Value> {
        let mut headers = Vec::new();
        if let Some(token) = access_token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        if request.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        // caller headers last so they take precedence on conflict
        headers.extend(request.headers.iter().cloned());

        let response = self
            .transport
            .send(HttpRequest {
                method: request.method.clone(),
                url: self.request_url(&request.path),
                headers,
                body: request.body.clone(),
            })
            .await?;

        classify(response)
    }

    fn request_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

/// Turn a raw response into the typed result callers see.
fn classify(response: HttpResponse) -> RequestResult<serde_json::Value> {
    // body text first, then structured data, so empty bodies are fine
    let parsed: Option<serde_json::Value> = if response.body.trim().is_empty() {
        None
    } else {
        serde_json::from_str(&response.body).ok()
    };

    if response.status == 401 {
        debug!("access credential rejected");
        return Err(RequestError::AuthenticationExpired);
    }

    if response.is_success() {
        return match parsed {
            Some(value) => Ok(value),
            None if response.body.trim().is_empty() => Ok(serde_json::Value::Null),
            None => Err(RequestError::SerializationError {
                message: "response body is not valid JSON".to_string(),
            }),
        };
    }

    Err(RequestError::RequestFailed {
        message: error_message(parsed.as_ref()),
    })
}

/// The server's human-readable message when it sent one, else the fallback.
pub(crate) fn error_message(body: Option<&serde_json::Value>) -> String {
    body.and_then(|value| {
        value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
    })
    .unwrap_or_else(|| REQUEST_FAILED_FALLBACK.to_string())
}
