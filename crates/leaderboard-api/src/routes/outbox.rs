//! Operator routes over the outbox.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use leaderboard_core::outbox::OutboxMessage;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Query string of `GET /dead-letters`.
#[derive(Debug, Default, Deserialize)]
pub struct DeadLetterQuery {
    /// Maximum number of messages to return.
    pub limit: Option<usize>,
}

/// GET /dead-letters
async fn list_dead_letters(
    State(state): State<AppState>,
    Query(query): Query<DeadLetterQuery>,
) -> Result<Json<Vec<OutboxMessage>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let messages = state.outbox.dead_letters(limit).await?;
    Ok(Json(messages))
}

/// Returns the router for outbox operator endpoints.
pub fn router() -> Router<AppState> {
    Router::new().route("/dead-letters", get(list_dead_letters))
}
