//! Delivery failure taxonomy.

use thiserror::Error;

/// Why a message ended up dead-lettered (or is about to be retried).
///
/// These never propagate to the writer of the aggregate; they are only
/// visible through the message state, the dead-letter sink and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The transport rejected the message as malformed. Never retried.
    #[error("message rejected: {0}")]
    ValidationFailure(String),

    /// A transient delivery failure. Consumes one attempt.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Every attempt failed with a transport-class error.
    #[error("delivery exhausted after {attempts} attempts: {last_error}")]
    DeliveryExhausted {
        /// Attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: String,
    },
}

impl DeliveryFailure {
    /// Whether this failure is terminal for the message.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::TransportFailure(_))
    }
}
