//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Store and version errors propagate synchronously to the caller of a write.
/// Outbox delivery failures never surface here; they live in the relay.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A read-modify-write targeted an aggregate with no event stream.
    #[error("{aggregate_type} not found: {aggregate_id}")]
    AggregateNotFound {
        /// The aggregate type name.
        aggregate_type: &'static str,
        /// The identifier that was looked up.
        aggregate_id: Uuid,
    },

    /// Optimistic concurrency conflict.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: u64,
        /// The actual version found.
        actual: u64,
    },

    /// `add` was called for an identity whose stream already exists.
    #[error("stream already exists for aggregate {0}")]
    StreamAlreadyExists(Uuid),

    /// The inbound resource version token is not a decimal `u64`.
    #[error("invalid resource version: {0:?}")]
    InvalidResourceVersion(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation was cancelled before any durable side effect.
    #[error("operation cancelled")]
    Cancelled,

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Builds an `AggregateNotFound` for aggregate type `A`.
    #[must_use]
    pub fn not_found<A: crate::aggregate::AggregateRoot>(aggregate_id: Uuid) -> Self {
        Self::AggregateNotFound {
            aggregate_type: A::AGGREGATE_TYPE,
            aggregate_id,
        }
    }

    /// Returns `true` for errors a caller resolves by re-reading and retrying.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::StreamAlreadyExists(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_versions() {
        let id = Uuid::nil();
        let err = DomainError::ConcurrencyConflict {
            aggregate_id: id,
            expected: 1,
            actual: 2,
        };

        assert_eq!(
            err.to_string(),
            format!("concurrency conflict on aggregate {id}: expected version 1, found 2")
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn test_not_found_is_not_a_conflict() {
        let err = DomainError::AggregateNotFound {
            aggregate_type: "Player",
            aggregate_id: Uuid::nil(),
        };

        assert!(!err.is_conflict());
        assert!(err.to_string().starts_with("Player not found"));
    }
}
