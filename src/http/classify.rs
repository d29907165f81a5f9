//! Request classification.
//!
//! Decides, without side effects, what a request gets:
//!
//! ```text
//! empty target            → Info
//! policy rejects          → Forbidden
//! allowed + OPTIONS       → Preflight
//! allowed + other method  → Forward
//! ```

use std::borrow::Cow;

use axum::http::{header, HeaderMap, Method, Uri};

use crate::http::target::extract_target;
use crate::security::AccessPolicy;

/// Outcome of classifying one incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// No target supplied: serve the usage text.
    Info,
    /// Target or origin rejected by the access policy.
    Forbidden,
    /// CORS preflight answered locally.
    Preflight,
    /// Proxy to the decoded target.
    Forward { target: String },
}

impl Disposition {
    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Info => "info",
            Disposition::Forbidden => "forbidden",
            Disposition::Preflight => "preflight",
            Disposition::Forward { .. } => "forwarded",
        }
    }
}

/// The request's `Origin` header, if any.
pub fn origin(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    headers
        .get(header::ORIGIN)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
}

pub fn classify(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    policy: &AccessPolicy,
) -> Disposition {
    let target = extract_target(uri);
    if target.is_empty() {
        return Disposition::Info;
    }

    let origin_value = origin(headers);
    if !policy.allows(&target, origin_value.as_deref()) {
        return Disposition::Forbidden;
    }

    if *method == Method::OPTIONS {
        Disposition::Preflight
    } else {
        Disposition::Forward { target }
    }
}
