use serde_json::json;

/// Canonical error type used across all modules.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable wire-level error discriminants surfaced to the browser client.
///
/// The client switches on `code`, never on the human-readable `error` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    RateLimitExceeded,
    ServerError,
    ConnectionError,
    StreamError,
    InvalidRequest,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::ConnectionError => "CONNECTION_ERROR",
            ErrorCode::StreamError => "STREAM_ERROR",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
        }
    }
}

/// Build the JSON error body shape shared by every error response.
#[must_use]
pub fn error_body(code: ErrorCode, message: &str) -> serde_json::Value {
    json!({
        "error": message,
        "code": code.as_str(),
    })
}

impl ProxyError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            ProxyError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            // Anything unexpected degrades to the connection-error shape; a
            // raw stack trace never reaches the client.
            ProxyError::Transport(_) | ProxyError::Internal(_) => ErrorCode::ConnectionError,
        }
    }

    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            ProxyError::Transport(_) | ProxyError::Internal(_) => {
                http::StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl axum::response::IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        let body = error_body(self.code(), &self.to_string());
        (self.status(), axum::Json(body)).into_response()
    }
}
