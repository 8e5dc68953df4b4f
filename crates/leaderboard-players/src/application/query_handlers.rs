//! Query handlers for the Players context.
//!
//! Queries replay the player's stream and return read-only view DTOs.

use leaderboard_core::aggregate::AggregateRoot;
use leaderboard_core::error::DomainError;
use leaderboard_core::store::AggregateStore;
use leaderboard_core::store_ext::AggregateStoreExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::aggregates::Player;

/// Read-only view of a player aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    /// The player identifier.
    pub player_id: Uuid,
    /// The name shown on the leaderboard.
    pub display_name: String,
    /// Sum of all recorded points.
    pub total_score: i64,
    /// Number of game events recorded.
    pub game_event_count: u64,
    /// Current version (event count).
    pub version: u64,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id,
            display_name: player.display_name.clone(),
            total_score: player.total_score,
            game_event_count: player.game_event_count,
            version: player.version(),
        }
    }
}

/// Retrieves a player by its aggregate ID. Removed players are reported as
/// not found.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the player does not exist or
/// was removed, or `DomainError::Infrastructure` if replay fails.
pub async fn get_player_by_id(
    player_id: Uuid,
    store: &dyn AggregateStore<Player>,
    cancel: &CancellationToken,
) -> Result<PlayerView, DomainError> {
    let player = store.get(player_id, cancel).await?;
    if player.is_deleted() {
        return Err(DomainError::not_found::<Player>(player_id));
    }
    Ok(PlayerView::from(&player))
}
