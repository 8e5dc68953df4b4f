//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use leaderboard_core::concurrency::ConcurrencyMode;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Whether writes without `If-Match` skip the version check.
    pub unversioned_writes: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        unversioned_writes: state.concurrency_mode == ConcurrencyMode::Relaxed,
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
