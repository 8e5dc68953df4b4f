//! Event repository abstraction: the durable append-only log the aggregate
//! store is built on.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::DomainError;
use crate::outbox::OutboxMessage;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream, starting at 1.
    pub sequence_number: u64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Version precondition for an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The stream must not exist yet.
    NoStream,
    /// The stream must be at exactly this version.
    Exact(u64),
    /// No check; the events land after whatever is there (last writer wins).
    Any,
}

impl ExpectedVersion {
    /// `Some(v)` becomes `Exact(v)`, `None` becomes `Any`.
    #[must_use]
    pub fn from_option(version: Option<u64>) -> Self {
        version.map_or(Self::Any, Self::Exact)
    }

    /// Checks the precondition against the stream's current version.
    ///
    /// Streams are never empty, so version 0 means "no stream".
    ///
    /// # Errors
    ///
    /// Returns `StreamAlreadyExists` or `ConcurrencyConflict` when the
    /// precondition does not hold.
    pub fn check(self, aggregate_id: Uuid, current: u64) -> Result<(), DomainError> {
        match self {
            Self::NoStream if current > 0 => Err(DomainError::StreamAlreadyExists(aggregate_id)),
            Self::Exact(expected) if expected != current => {
                Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual: current,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Repository trait for loading and appending domain events.
///
/// Implementations must make the version check, the event append and the
/// outbox enqueue one atomic step: either all of it commits or none of it.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load all events for a given aggregate, ordered by sequence number.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append events and their outbox messages to an aggregate stream with
    /// optimistic concurrency. Sequence numbers are assigned here, continuing
    /// from the stream's current version. Returns the version after the
    /// append.
    ///
    /// A cancelled `cancel` token is honoured before commit only.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: ExpectedVersion,
        events: &[StoredEvent],
        outbox: &[OutboxMessage],
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError>;
}
