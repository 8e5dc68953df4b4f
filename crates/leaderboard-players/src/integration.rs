//! Integration events published by the Players context.

use leaderboard_core::outbox::OutboxRoute;
use leaderboard_core::repository::StoredEvent;

use crate::domain::events::{
    PLAYER_CREATED_EVENT_TYPE, PLAYER_REMOVED_EVENT_TYPE, SCORE_RECORDED_EVENT_TYPE,
};

/// Destination for player lifecycle events.
pub const PLAYERS_DESTINATION: &str = "players";

/// Destination for game events consumed by the leaderboard.
pub const GAME_EVENTS_DESTINATION: &str = "game-events";

/// Routes player events to their outbox destinations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerOutboxRoute;

impl OutboxRoute for PlayerOutboxRoute {
    fn destination(&self, event: &StoredEvent) -> Option<String> {
        match event.event_type.as_str() {
            PLAYER_CREATED_EVENT_TYPE | PLAYER_REMOVED_EVENT_TYPE => {
                Some(PLAYERS_DESTINATION.to_owned())
            }
            SCORE_RECORDED_EVENT_TYPE => Some(GAME_EVENTS_DESTINATION.to_owned()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn event(event_type: &str) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            payload: serde_json::Value::Null,
            sequence_number: 1,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_routes_by_event_type() {
        let route = PlayerOutboxRoute;

        assert_eq!(
            route.destination(&event(PLAYER_CREATED_EVENT_TYPE)).as_deref(),
            Some("players")
        );
        assert_eq!(
            route.destination(&event(PLAYER_REMOVED_EVENT_TYPE)).as_deref(),
            Some("players")
        );
        assert_eq!(
            route.destination(&event(SCORE_RECORDED_EVENT_TYPE)).as_deref(),
            Some("game-events")
        );
        assert_eq!(route.destination(&event("players.renamed")), None);
    }
}
