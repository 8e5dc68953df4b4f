//! Commands for the Players context.

use leaderboard_core::command::Command;
use uuid::Uuid;

/// Command to register a new player.
#[derive(Debug, Clone)]
pub struct CreatePlayer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The name shown on the leaderboard.
    pub display_name: String,
}

/// Command to record points from a game event.
#[derive(Debug, Clone)]
pub struct RecordScore {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The player identifier.
    pub player_id: Uuid,
    /// Points awarded; never negative.
    pub points: i64,
    /// Version the caller last saw. `None` defers to the request's
    /// resource version.
    pub expected_version: Option<u64>,
}

/// Command to remove a player.
#[derive(Debug, Clone)]
pub struct RemovePlayer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The player identifier.
    pub player_id: Uuid,
    /// Version the caller last saw.
    pub expected_version: Option<u64>,
}

impl Command for CreatePlayer {
    fn command_type(&self) -> &'static str {
        "players.create_player"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for RecordScore {
    fn command_type(&self) -> &'static str {
        "players.record_score"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_aggregate_id(&self) -> Option<Uuid> {
        Some(self.player_id)
    }
}

impl Command for RemovePlayer {
    fn command_type(&self) -> &'static str {
        "players.remove_player"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_aggregate_id(&self) -> Option<Uuid> {
        Some(self.player_id)
    }
}
