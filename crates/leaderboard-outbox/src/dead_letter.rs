//! Dead-letter channel for messages the relay gave up on.

use async_trait::async_trait;
use leaderboard_core::outbox::OutboxMessage;

use crate::error::DeliveryFailure;

/// Receives messages that reached `failed-permanently`.
///
/// Called after the state change is stored, so a sink failure never loses
/// the message: it stays queryable as a dead letter in the outbox.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Handles one dead-lettered message.
    async fn dead_letter(&self, message: &OutboxMessage, failure: &DeliveryFailure);
}

/// Sink that reports dead letters as `error` events for operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDeadLetterSink;

#[async_trait]
impl DeadLetterSink for TracingDeadLetterSink {
    async fn dead_letter(&self, message: &OutboxMessage, failure: &DeliveryFailure) {
        tracing::error!(
            target: "outbox::dead_letter",
            message_id = %message.message_id,
            event_id = %message.event_id,
            aggregate_id = %message.aggregate_id,
            destination = %message.destination,
            message_type = %message.message_type,
            attempts = message.attempts,
            failure = %failure,
            "outbox message dead-lettered"
        );
    }
}
