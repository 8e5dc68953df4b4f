//! Command handlers for the Players context.
//!
//! Handlers orchestrate domain logic over an [`AggregateStore`]. They never
//! see resource-version tokens: when a command carries no expected version
//! the store decorator supplies the request's.

use leaderboard_core::aggregate::AggregateRoot;
use leaderboard_core::clock::Clock;
use leaderboard_core::command::Command;
use leaderboard_core::error::DomainError;
use leaderboard_core::store::AggregateStore;
use leaderboard_core::store_ext::AggregateStoreExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::aggregates::Player;
use crate::domain::commands::{CreatePlayer, RecordScore, RemovePlayer};

/// Identity and version of a player after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerWritten {
    /// The player identifier.
    pub player_id: Uuid,
    /// The stream version after the write.
    pub version: u64,
}

/// Handles the `CreatePlayer` command: assigns an identity, applies the
/// create domain method, and adds the new stream.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid display name, or the
/// store's error.
pub async fn handle_create_player(
    command: &CreatePlayer,
    clock: &dyn Clock,
    store: &dyn AggregateStore<Player>,
    cancel: &CancellationToken,
) -> Result<PlayerWritten, DomainError> {
    let player_id = Uuid::new_v4();
    let mut player = Player::create(
        player_id,
        &command.display_name,
        command.correlation_id,
        clock,
    )?;

    let version = store.add(&mut player, cancel).await?;
    tracing::info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        player_id = %player_id,
        version,
        "player created"
    );

    Ok(PlayerWritten { player_id, version })
}

/// Handles the `RecordScore` command with a read-modify-write.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the player does not exist,
/// `DomainError::Validation` if the player was removed or the points are
/// negative, and `DomainError::ConcurrencyConflict` if the player changed
/// since `expected_version`.
pub async fn handle_record_score(
    command: &RecordScore,
    clock: &dyn Clock,
    store: &dyn AggregateStore<Player>,
    cancel: &CancellationToken,
) -> Result<PlayerWritten, DomainError> {
    let version = store
        .get_and_update(
            command.player_id,
            |player: &mut Player| {
                player.record_score(command.points, command.correlation_id, clock)
            },
            command.expected_version,
            cancel,
        )
        .await?;

    tracing::debug!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        player_id = %command.player_id,
        points = command.points,
        version,
        "score recorded"
    );

    Ok(PlayerWritten {
        player_id: command.player_id,
        version,
    })
}

/// Handles the `RemovePlayer` command: loads the player, records the
/// removal, and appends the tombstone through `delete`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the player does not exist,
/// `DomainError::Validation` if it was already removed, and
/// `DomainError::ConcurrencyConflict` on a stale expected version.
pub async fn handle_remove_player(
    command: &RemovePlayer,
    clock: &dyn Clock,
    store: &dyn AggregateStore<Player>,
    cancel: &CancellationToken,
) -> Result<PlayerWritten, DomainError> {
    let mut player = store.get(command.player_id, cancel).await?;
    player.remove(command.correlation_id, clock)?;

    let version = store
        .delete(&mut player, command.expected_version, cancel)
        .await?;
    tracing::info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        player_id = %player.aggregate_id(),
        version,
        "player removed"
    );

    Ok(PlayerWritten {
        player_id: command.player_id,
        version,
    })
}
