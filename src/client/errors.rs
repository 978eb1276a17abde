use thiserror::Error;

/// Client-side request errors
#[derive(Error, Debug, Clone)]
pub enum RequestError {
    /// The server rejected the access credential (HTTP 401). Recovered
    /// internally by the refresh path and never handed to UI callers.
    #[error("authentication expired")]
    AuthenticationExpired,
    /// Any other non-2xx outcome, carrying the server's message when it sent
    /// one.
    #[error("request failed: {message}")]
    RequestFailed { message: String },
    /// Transport-level failure, no response received.
    #[error("network error: {message}")]
    NetworkError { message: String },
    /// Response or stored state could not be (de)serialized.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
    /// Durable storage write failed.
    #[error("storage error: {message}")]
    StorageError { message: String },
    /// The session was torn down because refresh failed or was impossible.
    #[error("session terminated")]
    SessionTerminated,
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::SerializationError {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations
pub type RequestResult<T> = Result<T, RequestError>;
