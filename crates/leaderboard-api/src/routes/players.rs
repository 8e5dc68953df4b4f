//! Routes for the Players bounded context.
//!
//! Writes take their expected version from `If-Match` and answer with the
//! new version as `ETag`; see [`crate::resource_version`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{ETAG, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use leaderboard_core::version::ResourceVersions;
use leaderboard_players::application::command_handlers::{self, PlayerWritten};
use leaderboard_players::application::query_handlers::{self, PlayerView};
use leaderboard_players::domain::commands::{CreatePlayer, RecordScore, RemovePlayer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::correlation_id;
use crate::error::ApiError;
use crate::resource_version::etag_for;
use crate::state::AppState;

/// Body of `POST /`.
#[derive(Debug, Deserialize)]
pub struct CreatePlayerRequest {
    /// The name shown on the leaderboard.
    pub display_name: String,
}

/// Body of `POST /{id}/game-events`.
#[derive(Debug, Deserialize)]
pub struct RecordGameEventRequest {
    /// Points awarded by the game event.
    pub points: i64,
}

/// Response for successful writes.
#[derive(Debug, Serialize)]
pub struct WriteResponse {
    /// The player identifier.
    pub player_id: Uuid,
    /// The stream version after the write.
    pub version: u64,
}

impl From<PlayerWritten> for WriteResponse {
    fn from(written: PlayerWritten) -> Self {
        Self {
            player_id: written.player_id,
            version: written.version,
        }
    }
}

/// POST /
async fn create_player(
    State(state): State<AppState>,
    Extension(versions): Extension<Arc<ResourceVersions>>,
    headers: HeaderMap,
    Json(body): Json<CreatePlayerRequest>,
) -> Result<Response, ApiError> {
    let command = CreatePlayer {
        correlation_id: correlation_id(&headers),
        display_name: body.display_name,
    };
    let store = state.players(versions);
    let written = command_handlers::handle_create_player(
        &command,
        state.clock.as_ref(),
        &store,
        &state.request_token(),
    )
    .await?;

    let mut response = (StatusCode::CREATED, Json(WriteResponse::from(written))).into_response();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/players/{}", written.player_id))
    {
        response.headers_mut().insert(LOCATION, location);
    }
    Ok(response)
}

/// GET /{id}
async fn get_player(
    State(state): State<AppState>,
    Extension(versions): Extension<Arc<ResourceVersions>>,
    Path(player_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let store = state.players(versions);
    let view: PlayerView =
        query_handlers::get_player_by_id(player_id, &store, &state.request_token()).await?;

    let etag = etag_for(view.version);
    let mut response = Json(view).into_response();
    if let Some(etag) = etag {
        response.headers_mut().insert(ETAG, etag);
    }
    Ok(response)
}

/// POST /{id}/game-events
async fn record_game_event(
    State(state): State<AppState>,
    Extension(versions): Extension<Arc<ResourceVersions>>,
    Path(player_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<RecordGameEventRequest>,
) -> Result<Json<WriteResponse>, ApiError> {
    let command = RecordScore {
        correlation_id: correlation_id(&headers),
        player_id,
        points: body.points,
        expected_version: None,
    };
    let store = state.players(versions);
    let written = command_handlers::handle_record_score(
        &command,
        state.clock.as_ref(),
        &store,
        &state.request_token(),
    )
    .await?;
    Ok(Json(WriteResponse::from(written)))
}

/// DELETE /{id}
async fn remove_player(
    State(state): State<AppState>,
    Extension(versions): Extension<Arc<ResourceVersions>>,
    Path(player_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let command = RemovePlayer {
        correlation_id: correlation_id(&headers),
        player_id,
        expected_version: None,
    };
    let store = state.players(versions);
    command_handlers::handle_remove_player(
        &command,
        state.clock.as_ref(),
        &store,
        &state.request_token(),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the players context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_player))
        .route("/{id}", get(get_player).delete(remove_player))
        .route("/{id}/game-events", post(record_game_event))
}
