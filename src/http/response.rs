//! Response construction and transformation.
//!
//! # Responsibilities
//! - Static pages (usage text, 403 rejection)
//! - Local answers to CORS preflight requests
//! - Add CORS headers to upstream responses
//!
//! # Design Decisions
//! - Upstream status, headers and body stream pass through untouched;
//!   only `Access-Control-Allow-Origin` and `Access-Control-Expose-Headers`
//!   are set on top
//! - Bodies are never buffered on the way back

use axum::{
    body::Body,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
            ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, CONTENT_TYPE, HOST,
            ORIGIN,
        },
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

pub const PROJECT_NAME: &str = "CLOUDFLARE-CORS-ANYWHERE";
pub const SOURCE_URL: &str = "https://github.com/Zibri/cloudflare-cors-anywhere";
pub const DONATE_URL: &str = "https://paypal.me/Zibri/5";

/// Methods advertised when the preflight does not name one.
pub const DEFAULT_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Preflight cache lifetime: 24 hours.
pub const PREFLIGHT_MAX_AGE: &str = "86400";

/// Usage text served when no target is given.
///
/// The limits are informational only; nothing enforces them.
pub fn info_page(uri: &Uri, headers: &HeaderMap) -> Response {
    let body = format!(
        "{PROJECT_NAME}\n\n\
         Source:\n{SOURCE_URL}\n\n\
         Usage:\n{origin}/?uri\n\n\
         Donate:\n{DONATE_URL}\n\n\
         Limits: 100,000 requests/day\n          1,000 requests/10 minutes\n\n",
        origin = public_origin(uri, headers),
    );
    (StatusCode::OK, [(CONTENT_TYPE, "text/plain")], body).into_response()
}

/// Rejection page for requests refused by the access policy.
pub fn forbidden_page() -> Response {
    let body = format!(
        "Create your own CORS proxy</br>\n\
         <a href='{SOURCE_URL}'>{SOURCE_URL}</a></br>\n\
         \nDonate</br>\n\
         <a href='{DONATE_URL}'>{DONATE_URL}</a>\n"
    );
    (StatusCode::FORBIDDEN, [(CONTENT_TYPE, "text/html")], body).into_response()
}

/// Answer a CORS preflight without contacting the upstream.
pub fn preflight_response(request_headers: &HeaderMap) -> Response {
    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();

    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        allow_origin(request_headers.get(ORIGIN)),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        request_headers
            .get(ACCESS_CONTROL_REQUEST_METHOD)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOW_METHODS)),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        request_headers
            .get(ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("")),
    );
    headers.insert(
        ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );

    response
}

/// Add CORS headers to an upstream response.
///
/// Every header name the upstream sent is listed in
/// `Access-Control-Expose-Headers` so browser scripts can read it.
pub fn rewrite_response(mut response: Response, origin: Option<&HeaderValue>) -> Response {
    let exposed = exposed_header_names(response.headers());
    let headers = response.headers_mut();

    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin(origin));
    match HeaderValue::from_str(&exposed) {
        Ok(value) => {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, value);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not build Access-Control-Expose-Headers");
        }
    }

    response
}

/// Set only `Access-Control-Allow-Origin`, for locally generated error
/// responses on the forwarding path.
pub fn with_allow_origin(mut response: Response, origin: Option<&HeaderValue>) -> Response {
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin(origin));
    response
}

/// Distinct header names, sorted, joined with ", ".
fn exposed_header_names(headers: &HeaderMap) -> String {
    let mut names: Vec<&str> = headers.keys().map(|k| k.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    names.join(", ")
}

/// The caller's Origin, or `*` when absent or empty.
fn allow_origin(origin: Option<&HeaderValue>) -> HeaderValue {
    match origin {
        Some(v) if !v.is_empty() => v.clone(),
        _ => HeaderValue::from_static("*"),
    }
}

/// `scheme://host` under which this proxy was reached.
///
/// Behind a TLS terminator the scheme comes from `X-Forwarded-Proto`.
fn public_origin(uri: &Uri, headers: &HeaderMap) -> String {
    if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
        return format!("{scheme}://{authority}");
    }
    match headers.get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("{}://{host}", forwarded_scheme(headers)),
        None => String::new(),
    }
}

/// First `X-Forwarded-Proto` entry when it is http or https, else `http`.
fn forwarded_scheme(headers: &HeaderMap) -> &'static str {
    let proto = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim());
    match proto {
        Some(p) if p.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}
