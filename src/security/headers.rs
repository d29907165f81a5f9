//! Header sanitizing for outbound requests.
//!
//! # Responsibilities
//! - Strip headers that identify the client or the proxy hop
//!
//! # Design Decisions
//! - Removal is case-insensitive (HeaderName is always lowercase)
//! - Everything else is forwarded untouched

use axum::http::HeaderMap;

/// Request headers never forwarded to the upstream.
pub const STRIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "origin",
    "referer",
    "cf-connecting-ip",
    "cf-ipcountry",
    "x-forwarded-for",
];

/// Remove every header in [`STRIPPED_REQUEST_HEADERS`], including repeats.
pub fn strip_request_headers(headers: &mut HeaderMap) {
    for name in STRIPPED_REQUEST_HEADERS {
        headers.remove(*name);
    }
}
