//! Request body limits.
//!
//! # Responsibilities
//! - Buffer payload-carrying request bodies up to a configured size
//! - Decide which methods carry a body at all
//!
//! # Design Decisions
//! - Only POST, PUT and PATCH bodies are read; others are never touched
//! - Size is checked as frames arrive, so oversized bodies are cut off early
//! - Oversized bodies return 413 Payload Too Large

use std::error::Error as StdError;

use axum::{
    body::{Body, Bytes},
    http::Method,
};
use http_body_util::LengthLimitError;

use crate::error::ProxyError;

/// Methods whose body is buffered and forwarded.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Read the whole body into memory, up to `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeded_limit(&e) {
            ProxyError::BodyTooLarge { limit }
        } else {
            ProxyError::BodyRead(e.to_string())
        }
    })
}

fn exceeded_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}
