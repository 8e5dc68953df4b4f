//! Aggregate roots for the Players context.

use leaderboard_core::aggregate::AggregateRoot;
use leaderboard_core::clock::Clock;
use leaderboard_core::error::DomainError;
use leaderboard_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

use super::events::{PlayerCreated, PlayerEvent, PlayerEventKind, PlayerRemoved, ScoreRecorded};

/// Longest accepted display name, in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 64;

/// The aggregate root for a player.
#[derive(Debug)]
pub struct Player {
    /// Aggregate identifier.
    pub id: Uuid,
    /// The name shown on the leaderboard.
    pub display_name: String,
    /// Sum of all recorded points.
    pub total_score: i64,
    /// Number of game events recorded.
    pub game_event_count: u64,
    /// Whether the player has been removed.
    pub removed: bool,
    version: u64,
    uncommitted_events: Vec<PlayerEvent>,
}

impl Player {
    /// Registers a new player, producing a `PlayerCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the display name is blank or
    /// longer than [`MAX_DISPLAY_NAME_LEN`] characters.
    pub fn create(
        id: Uuid,
        display_name: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::Validation(
                "display name must not be empty".into(),
            ));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "display name must be at most {MAX_DISPLAY_NAME_LEN} characters"
            )));
        }

        let mut player = Self::with_id(id);
        player.record(
            PlayerEventKind::PlayerCreated(PlayerCreated {
                player_id: id,
                display_name: display_name.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(player)
    }

    /// Records points from a game event, producing a `ScoreRecorded` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the player was removed,
    /// `points` is negative, or the total score would overflow.
    pub fn record_score(
        &mut self,
        points: i64,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if points < 0 {
            return Err(DomainError::Validation(format!(
                "points must not be negative, got {points}"
            )));
        }
        if self.total_score.checked_add(points).is_none() {
            return Err(DomainError::Validation(format!(
                "total score {} cannot absorb {points} more points",
                self.total_score
            )));
        }
        self.record(
            PlayerEventKind::ScoreRecorded(ScoreRecorded {
                player_id: self.id,
                game_event_id: Uuid::new_v4(),
                points,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Removes the player, producing a `PlayerRemoved` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the player was already removed.
    pub fn remove(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_active()?;
        self.mark_deleted(correlation_id, clock);
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.removed {
            return Err(DomainError::Validation(format!(
                "player {} has been removed",
                self.id
            )));
        }
        Ok(())
    }

    fn record(&mut self, kind: PlayerEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let mut event = PlayerEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: String::new(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        event.metadata.event_type = event.event_type().to_owned();
        self.apply(&event);
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for Player {
    type Event = PlayerEvent;

    const AGGREGATE_TYPE: &'static str = "Player";

    fn with_id(id: Uuid) -> Self {
        Self {
            id,
            display_name: String::new(),
            total_score: 0,
            game_event_count: 0,
            removed: false,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &PlayerEvent) {
        match &event.kind {
            PlayerEventKind::PlayerCreated(e) => {
                self.display_name.clone_from(&e.display_name);
            }
            PlayerEventKind::ScoreRecorded(e) => {
                self.total_score += e.points;
                self.game_event_count += 1;
            }
            PlayerEventKind::PlayerRemoved(_) => {
                self.removed = true;
            }
        }
    }

    fn uncommitted_events(&self) -> &[PlayerEvent] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    fn mark_committed(&mut self, version: u64) {
        self.version = version;
    }

    fn is_deleted(&self) -> bool {
        self.removed
    }

    fn mark_deleted(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        self.record(
            PlayerEventKind::PlayerRemoved(PlayerRemoved { player_id: self.id }),
            correlation_id,
            clock,
        );
    }
}
