//! Test aggregate: a minimal event-sourced `Scorecard` for store tests.

use leaderboard_core::aggregate::AggregateRoot;
use leaderboard_core::clock::Clock;
use leaderboard_core::error::DomainError;
use leaderboard_core::event::{DomainEvent, EventMetadata, decode_payload};
use leaderboard_core::repository::StoredEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type identifier for `ScorecardEventKind::Created`.
pub const SCORECARD_CREATED: &str = "scorecard.created";

/// Event type identifier for `ScorecardEventKind::Scored`.
pub const SCORECARD_SCORED: &str = "scorecard.scored";

/// Event type identifier for `ScorecardEventKind::Deleted`.
pub const SCORECARD_DELETED: &str = "scorecard.deleted";

/// Scorecard event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScorecardEventKind {
    /// The scorecard was opened.
    Created {
        /// Display name.
        name: String,
    },
    /// Points were scored.
    Scored {
        /// Points added.
        points: i64,
    },
    /// Tombstone.
    Deleted,
}

/// Scorecard event envelope.
#[derive(Debug, Clone)]
pub struct ScorecardEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: ScorecardEventKind,
}

impl DomainEvent for ScorecardEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            ScorecardEventKind::Created { .. } => SCORECARD_CREATED,
            ScorecardEventKind::Scored { .. } => SCORECARD_SCORED,
            ScorecardEventKind::Deleted => SCORECARD_DELETED,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).expect("ScorecardEventKind serialization is infallible")
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

/// A scorecard: a name and a running list of scores.
#[derive(Debug)]
pub struct Scorecard {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Name given at creation.
    pub name: Option<String>,
    /// Every score in order.
    pub scores: Vec<i64>,
    /// Sum of `scores`.
    pub total: i64,
    /// Whether the tombstone was applied.
    pub deleted: bool,
    version: u64,
    uncommitted_events: Vec<ScorecardEvent>,
}

impl Scorecard {
    /// Opens a new scorecard, producing a `Created` event.
    #[must_use]
    pub fn create(id: Uuid, name: &str, clock: &dyn Clock) -> Self {
        let mut card = Self::with_id(id);
        card.record(
            ScorecardEventKind::Created {
                name: name.to_owned(),
            },
            Uuid::new_v4(),
            clock,
        );
        card
    }

    /// Adds points, producing a `Scored` event.
    pub fn score(&mut self, points: i64, clock: &dyn Clock) {
        self.record(ScorecardEventKind::Scored { points }, Uuid::new_v4(), clock);
    }

    fn record(&mut self, kind: ScorecardEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let mut event = ScorecardEvent {
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

impl AggregateRoot for Scorecard {
    type Event = ScorecardEvent;

    const AGGREGATE_TYPE: &'static str = "Scorecard";

    fn with_id(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            scores: Vec::new(),
            total: 0,
            deleted: false,
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

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            ScorecardEventKind::Created { name } => self.name = Some(name.clone()),
            ScorecardEventKind::Scored { points } => {
                self.scores.push(*points);
                self.total += points;
            }
            ScorecardEventKind::Deleted => self.deleted = true,
        }
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }

    fn mark_committed(&mut self, version: u64) {
        self.version = version;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        self.record(ScorecardEventKind::Deleted, correlation_id, clock);
    }
}
