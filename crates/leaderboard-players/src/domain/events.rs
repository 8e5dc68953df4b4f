//! Domain events for the Players context.

use leaderboard_core::error::DomainError;
use leaderboard_core::event::{DomainEvent, EventMetadata, decode_payload};
use leaderboard_core::repository::StoredEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type identifier for `PlayerCreated`.
pub const PLAYER_CREATED_EVENT_TYPE: &str = "players.player_created";

/// Event type identifier for `ScoreRecorded`.
pub const SCORE_RECORDED_EVENT_TYPE: &str = "players.score_recorded";

/// Event type identifier for `PlayerRemoved`.
pub const PLAYER_REMOVED_EVENT_TYPE: &str = "players.player_removed";

/// Emitted when a player registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCreated {
    /// The player identifier.
    pub player_id: Uuid,
    /// The name shown on the leaderboard.
    pub display_name: String,
}

/// Emitted when a game event awards points to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecorded {
    /// The player identifier.
    pub player_id: Uuid,
    /// The game event identifier, for consumer-side deduplication.
    pub game_event_id: Uuid,
    /// Points awarded.
    pub points: i64,
}

/// Emitted when a player is removed. Tombstone for the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRemoved {
    /// The player identifier.
    pub player_id: Uuid,
}

/// Event payload variants for the Players context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEventKind {
    /// A player has registered.
    PlayerCreated(PlayerCreated),
    /// A player scored points.
    ScoreRecorded(ScoreRecorded),
    /// A player has been removed.
    PlayerRemoved(PlayerRemoved),
}

/// Domain event envelope for the Players context.
#[derive(Debug, Clone)]
pub struct PlayerEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: PlayerEventKind,
}

impl DomainEvent for PlayerEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            PlayerEventKind::PlayerCreated(_) => PLAYER_CREATED_EVENT_TYPE,
            PlayerEventKind::ScoreRecorded(_) => SCORE_RECORDED_EVENT_TYPE,
            PlayerEventKind::PlayerRemoved(_) => PLAYER_REMOVED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("PlayerEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind: decode_payload(stored)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use leaderboard_core::event::to_stored_event;

    use super::*;

    #[test]
    fn test_stored_event_decodes_back_to_the_same_kind() {
        // Arrange
        let player_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let event = PlayerEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: SCORE_RECORDED_EVENT_TYPE.to_owned(),
                aggregate_id: player_id,
                sequence_number: 2,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            },
            kind: PlayerEventKind::ScoreRecorded(ScoreRecorded {
                player_id,
                game_event_id: Uuid::new_v4(),
                points: 250,
            }),
        };

        // Act
        let stored = to_stored_event(&event);
        let decoded = PlayerEvent::from_stored(&stored).unwrap();

        // Assert
        assert_eq!(stored.event_type, SCORE_RECORDED_EVENT_TYPE);
        assert_eq!(decoded.kind, event.kind);
        assert_eq!(decoded.metadata, event.metadata);
    }

    #[test]
    fn test_unknown_payload_is_an_infrastructure_error() {
        // Arrange
        let stored = StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: "players.unknown".to_owned(),
            payload: serde_json::json!({"Unknown": {}}),
            sequence_number: 1,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        };

        // Act
        let result = PlayerEvent::from_stored(&stored);

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
