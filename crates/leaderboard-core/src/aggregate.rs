//! Aggregate root abstraction.

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::repository::StoredEvent;

/// Trait for aggregate roots that reconstitute from event history.
///
/// State changes only through [`apply`](AggregateRoot::apply). Domain methods
/// build an event, apply it and queue it as uncommitted; the store drains the
/// queue on persist and then advances the committed version.
pub trait AggregateRoot: Send + Sync + 'static {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Type name used in not-found errors and logs.
    const AGGREGATE_TYPE: &'static str;

    /// Creates the empty state that replay starts from.
    fn with_id(id: Uuid) -> Self
    where
        Self: Sized;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the committed version (number of persisted events).
    fn version(&self) -> u64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Drains uncommitted events for persistence.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;

    /// Records the version the store reported after a successful write.
    fn mark_committed(&mut self, version: u64);

    /// Whether a deletion marker has been applied.
    fn is_deleted(&self) -> bool;

    /// Applies and queues the domain's deletion marker (tombstone) event.
    fn mark_deleted(&mut self, correlation_id: Uuid, clock: &dyn Clock);

    /// Returns the sequence number the next recorded event will carry.
    fn next_sequence_number(&self) -> u64 {
        self.version() + self.uncommitted_events().len() as u64 + 1
    }
}

/// Rebuilds an aggregate by folding its stored events from the empty state.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub fn reconstitute<A: AggregateRoot>(
    aggregate_id: Uuid,
    stored_events: &[StoredEvent],
) -> Result<A, DomainError> {
    let mut aggregate = A::with_id(aggregate_id);
    let mut version = 0;
    for stored in stored_events {
        let event = A::Event::from_stored(stored)?;
        aggregate.apply(&event);
        version = stored.sequence_number;
    }
    aggregate.mark_committed(version);
    Ok(aggregate)
}
