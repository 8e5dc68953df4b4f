//! Message transport abstraction.

use async_trait::async_trait;
use leaderboard_core::outbox::OutboxMessage;
use thiserror::Error;

/// Transport send failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The broker or consumer refused the message as invalid.
    #[error("rejected by transport: {0}")]
    Rejected(String),

    /// The broker could not be reached or answered with a server error.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// No acknowledgement within the send timeout.
    #[error("transport timed out")]
    Timeout,
}

impl TransportError {
    /// Transient errors are retried; rejections are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Sends outbox messages to their destination.
///
/// `Ok(())` means the transport acknowledged the message. The same message
/// may be sent more than once; consumers deduplicate on `message_id`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: &OutboxMessage) -> Result<(), TransportError>;
}
