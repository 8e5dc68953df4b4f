//! Transactional outbox model.
//!
//! Integration messages are captured from appended events and committed in
//! the same atomic append. A relay later delivers them; only the relay
//! changes a message after creation.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Delivery state of an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryState {
    /// Enqueued, never attempted.
    Pending,
    /// At least one transient failure; waiting for `next_attempt_at`.
    Retrying,
    /// Acknowledged by the transport.
    Delivered,
    /// Rejected or out of attempts. Terminal; dead-lettered.
    FailedPermanently,
}

impl DeliveryState {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retrying => "retrying",
            Self::Delivered => "delivered",
            Self::FailedPermanently => "failed-permanently",
        }
    }

    /// Whether the relay may still attempt this message.
    #[must_use]
    pub fn is_dispatchable(self) -> bool {
        matches!(self, Self::Pending | Self::Retrying)
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "retrying" => Ok(Self::Retrying),
            "delivered" => Ok(Self::Delivered),
            "failed-permanently" => Ok(Self::FailedPermanently),
            other => Err(DomainError::Infrastructure(format!(
                "unknown outbox delivery state: {other}"
            ))),
        }
    }
}

/// An integration message awaiting (or done with) delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Unique message identifier; consumers deduplicate on it.
    pub message_id: Uuid,
    /// The event this message was captured from.
    pub event_id: Uuid,
    /// The aggregate that produced the event.
    pub aggregate_id: Uuid,
    /// Routing destination (topic, queue or endpoint name).
    pub destination: String,
    /// Message type, taken from the event type.
    pub message_type: String,
    /// JSON payload.
    pub payload: serde_json::Value,
    /// Correlation ID carried over from the event.
    pub correlation_id: Uuid,
    /// Current delivery state.
    pub state: DeliveryState,
    /// Delivery attempts made so far.
    pub attempts: u32,
    /// When the message was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// Earliest time the relay may attempt delivery.
    pub next_attempt_at: DateTime<Utc>,
    /// When the transport acknowledged the message.
    pub delivered_at: Option<DateTime<Utc>>,
    /// The most recent delivery error.
    pub last_error: Option<String>,
}

impl OutboxMessage {
    /// Captures a `pending` message for a stored event.
    #[must_use]
    pub fn capture(
        event: &StoredEvent,
        destination: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            event_id: event.event_id,
            aggregate_id: event.aggregate_id,
            destination: destination.into(),
            message_type: event.event_type.clone(),
            payload: event.payload.clone(),
            correlation_id: event.correlation_id,
            state: DeliveryState::Pending,
            attempts: 0,
            enqueued_at: now,
            next_attempt_at: now,
            delivered_at: None,
            last_error: None,
        }
    }

    /// Attempts beyond the first.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Decides which appended events become integration messages.
pub trait OutboxRoute: Send + Sync {
    /// Returns the destination for `event`, or `None` to keep it internal.
    fn destination(&self, event: &StoredEvent) -> Option<String>;
}

/// Route that publishes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutbox;

impl OutboxRoute for NoOutbox {
    fn destination(&self, _event: &StoredEvent) -> Option<String> {
        None
    }
}

/// Route that sends every event to one destination.
#[derive(Debug, Clone)]
pub struct SingleDestination(pub String);

impl OutboxRoute for SingleDestination {
    fn destination(&self, _event: &StoredEvent) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Persistence operations the relay performs on the outbox.
///
/// Enqueueing is not here: it happens inside
/// [`EventRepository::append_events`](crate::repository::EventRepository::append_events).
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Returns up to `limit` dispatchable messages due at `now`, in enqueue
    /// order. Shared backends claim the returned messages so concurrent
    /// relays do not dispatch them twice.
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxMessage>, DomainError>;

    /// Marks a message delivered after transport acknowledgement.
    async fn mark_delivered(
        &self,
        message_id: Uuid,
        attempts: u32,
        delivered_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Moves a message to `retrying` with its next attempt time.
    async fn schedule_retry(
        &self,
        message_id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), DomainError>;

    /// Moves a message to `failed-permanently`.
    async fn mark_failed(
        &self,
        message_id: Uuid,
        attempts: u32,
        error: &str,
    ) -> Result<(), DomainError>;

    /// Returns up to `limit` permanently failed messages, oldest first.
    async fn dead_letters(&self, limit: usize) -> Result<Vec<OutboxMessage>, DomainError>;
}
