//! Route modules.

pub mod health;
pub mod outbox;
pub mod players;

use axum::http::HeaderMap;
use uuid::Uuid;

/// Header a caller may use to supply its own correlation ID.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// The caller's correlation ID, or a fresh one.
pub(crate) fn correlation_id(headers: &HeaderMap) -> Uuid {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}
