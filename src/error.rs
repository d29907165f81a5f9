//! Per-request failures and their mapping to HTTP responses.
//!
//! Nothing leaves the handler as an error: every variant renders as a short
//! plain-text response with a fitting status.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Incoming body exceeded `limits.max_body_size`.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Incoming body could not be read.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// Target is not an absolute http(s) URL.
    #[error("invalid target URL {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// DNS, connect, TLS or protocol failure talking to the upstream.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Upstream did not answer within the configured deadline.
    #[error("upstream did not respond within {0} seconds")]
    UpstreamTimeout(u64),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidTarget { .. } | ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            ProxyError::BodyTooLarge { .. } => "Request body too large",
            ProxyError::BodyRead(_) => "Failed to read request body",
            ProxyError::InvalidTarget { .. } => "Invalid target URL",
            ProxyError::Upstream(_) => "Upstream request failed",
            ProxyError::UpstreamTimeout(_) => "Upstream request timed out",
        };
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain")],
            body,
        )
            .into_response()
    }
}
