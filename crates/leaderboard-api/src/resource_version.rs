//! `If-Match` / `ETag` propagation.
//!
//! [`propagate`] creates one [`ResourceVersions`] per request from the
//! `If-Match` header and inserts it as a request extension. After the
//! handler returns, the next version recorded by a write (if any) becomes
//! the response's `ETag`.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::http::header::{ETAG, IF_MATCH};
use axum::middleware::Next;
use axum::response::Response;
use leaderboard_core::version::{ResourceVersions, format_resource_version};

/// Middleware that scopes resource versions to the request.
pub async fn propagate(mut request: Request, next: Next) -> Response {
    let expected = request
        .headers()
        .get(IF_MATCH)
        .and_then(|value| if_match_token(&String::from_utf8_lossy(value.as_bytes())));
    let versions = Arc::new(ResourceVersions::new(expected));
    request.extensions_mut().insert(Arc::clone(&versions));

    let mut response = next.run(request).await;

    if let Some(etag) = versions.next().as_deref().and_then(etag_value) {
        response.headers_mut().insert(ETAG, etag);
    }
    response
}

/// Extracts the token from an `If-Match` value. Surrounding quotes and a weak
/// `W/` prefix are stripped; `*` means "any version" and yields `None`.
fn if_match_token(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" {
        return None;
    }
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    let token = raw
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(raw);
    Some(token.to_owned())
}

fn etag_value(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("\"{token}\"")).ok()
}

/// The `ETag` for a version read without a write.
#[must_use]
pub fn etag_for(version: u64) -> Option<HeaderValue> {
    etag_value(&format_resource_version(version))
}
