//! Leaderboard API: HTTP surface for the players context.
//!
//! Every request gets its own resource-version context: `If-Match` is read
//! into it on the way in and the version produced by a write leaves as
//! `ETag` on the way out.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod resource_version;
pub mod routes;
pub mod state;

use axum::Router;
use axum::middleware;

use crate::state::AppState;

/// Builds the application router with every route and the resource-version
/// middleware. Transport layers (tracing, CORS) are added by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/players", routes::players::router())
        .nest("/api/v1/outbox", routes::outbox::router())
        .layer(middleware::from_fn(resource_version::propagate))
        .with_state(state)
}
