//! Outbound request construction and forwarding.
//!
//! # Responsibilities
//! - Validate the decoded target URL
//! - Copy the incoming method, headers and (for POST/PUT/PATCH) body
//! - Strip client-identifying headers
//! - Send upstream with a deadline covering headers and body, following redirects
//!
//! # Design Decisions
//! - One `reqwest::Client` per server; it is cheap to clone and shares a pool
//! - Exactly one attempt, no retries
//! - The upstream body is handed back as a stream, never buffered

use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header::{CONTENT_LENGTH, TRANSFER_ENCODING},
        HeaderMap, Request,
    },
    response::Response,
};
use reqwest::redirect;
use url::Url;

use crate::config::{LimitsConfig, TimeoutConfig};
use crate::error::ProxyError;
use crate::resilience::with_deadline;
use crate::security::headers::strip_request_headers;
use crate::security::limits::{carries_body, read_body};

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Sends sanitized copies of incoming requests to their targets.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    upstream_timeout: Duration,
    max_body_size: usize,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig, limits: &LimitsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
            max_body_size: limits.max_body_size,
        })
    }

    /// Forward `request` to `target` and return the upstream response as is.
    pub async fn forward(&self, request: Request<Body>, target: &str) -> Result<Response, ProxyError> {
        let url = parse_target(target)?;
        let (parts, body) = request.into_parts();

        // Body framing is recomputed by the client for the outbound hop.
        let mut headers = outbound_headers(parts.headers);
        headers.remove(CONTENT_LENGTH);
        headers.remove(TRANSFER_ENCODING);

        // The client-side timeout also covers streaming the response body.
        let mut builder = self
            .client
            .request(parts.method.clone(), url)
            .headers(headers)
            .timeout(self.upstream_timeout);

        if carries_body(&parts.method) {
            let bytes = read_body(body, self.max_body_size).await?;
            tracing::debug!(bytes = bytes.len(), "Buffered request body");
            builder = builder.body(bytes);
        }

        let send = async {
            builder
                .send()
                .await
                .map_err(|e| upstream_error(e, self.upstream_timeout))
        };
        let upstream = with_deadline(send, self.upstream_timeout).await?;
        tracing::debug!(
            status = %upstream.status(),
            final_url = %upstream.url(),
            "Upstream responded"
        );

        let (parts, body) = http_response(upstream).into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

fn upstream_error(err: reqwest::Error, deadline: Duration) -> ProxyError {
    if err.is_timeout() {
        ProxyError::UpstreamTimeout(deadline.as_secs())
    } else {
        ProxyError::Upstream(err)
    }
}

fn http_response(upstream: reqwest::Response) -> axum::http::Response<reqwest::Body> {
    upstream.into()
}

/// Incoming headers minus the stripped set.
pub fn outbound_headers(mut headers: HeaderMap) -> HeaderMap {
    strip_request_headers(&mut headers);
    headers
}

/// Parse the decoded target; only absolute http(s) URLs are forwarded.
pub fn parse_target(target: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(target).map_err(|e| ProxyError::InvalidTarget {
        target: target.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProxyError::InvalidTarget {
            target: target.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
