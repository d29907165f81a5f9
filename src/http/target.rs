//! Target URL extraction.
//!
//! The target travels as the raw query string and is percent-decoded twice:
//! clients encode it once themselves and most tooling encodes the query
//! again. A single decode is not enough, e.g. `https%3A%2F%2Fa.test%2Fapi%253Fx%3D1`
//! only becomes `https://a.test/api?x=1` after the second pass.
//!
//! Any decode failure (malformed `%` escape, invalid UTF-8) yields an empty
//! target, which the classifier answers with the informational page.

use axum::http::Uri;

/// Extract the double-decoded target from a request URI.
///
/// Returns an empty string when there is no query, the query is empty, or
/// either decode step fails.
pub fn extract_target(uri: &Uri) -> String {
    uri.query()
        .and_then(decode_component)
        .and_then(|once| decode_component(&once))
        .unwrap_or_default()
}

/// Strict percent-decoding: every `%` must start a valid two-digit hex
/// escape and the result must be valid UTF-8. `+` is left as is.
fn decode_component(input: &str) -> Option<String> {
    if !has_valid_escapes(input) {
        return None;
    }
    urlencoding::decode(input).ok().map(|s| s.into_owned())
}

fn has_valid_escapes(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
