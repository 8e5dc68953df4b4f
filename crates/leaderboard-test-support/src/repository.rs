//! Test repositories: in-memory and failing `EventRepository`
//! implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leaderboard_core::error::DomainError;
use leaderboard_core::outbox::{DeliveryState, OutboxMessage, OutboxRepository};
use leaderboard_core::repository::{EventRepository, ExpectedVersion, StoredEvent};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    streams: HashMap<Uuid, Vec<StoredEvent>>,
    outbox: Vec<OutboxMessage>,
}

/// An in-memory event log and outbox sharing one lock, so the version check,
/// the event append and the outbox enqueue commit together exactly like the
/// PostgreSQL implementation's single transaction.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: Mutex<State>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version (event count) of a stream; 0 if it does not exist.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream_version(&self, aggregate_id: Uuid) -> u64 {
        self.state
            .lock()
            .unwrap()
            .streams
            .get(&aggregate_id)
            .map_or(0, |stream| stream.len() as u64)
    }

    /// Snapshot of a stream's events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self, aggregate_id: Uuid) -> Vec<StoredEvent> {
        self.state
            .lock()
            .unwrap()
            .streams
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of every outbox message in enqueue order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn outbox_messages(&self) -> Vec<OutboxMessage> {
        self.state.lock().unwrap().outbox.clone()
    }

    /// Snapshot of one outbox message.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn outbox_message(&self, message_id: Uuid) -> Option<OutboxMessage> {
        self.state
            .lock()
            .unwrap()
            .outbox
            .iter()
            .find(|m| m.message_id == message_id)
            .cloned()
    }

    /// Enqueues a message directly, bypassing the event log.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn enqueue(&self, message: OutboxMessage) {
        self.state.lock().unwrap().outbox.push(message);
    }

    fn update_message(
        &self,
        message_id: Uuid,
        change: impl FnOnce(&mut OutboxMessage),
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let message = state
            .outbox
            .iter_mut()
            .find(|m| m.message_id == message_id)
            .ok_or_else(|| {
                DomainError::Infrastructure(format!("outbox message {message_id} not found"))
            })?;
        change(message);
        Ok(())
    }
}

#[async_trait]
impl EventRepository for InMemoryEventStore {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.events(aggregate_id))
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: ExpectedVersion,
        events: &[StoredEvent],
        outbox: &[OutboxMessage],
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;

        let current = state
            .streams
            .get(&aggregate_id)
            .map_or(0, |stream| stream.len() as u64);
        expected_version.check(aggregate_id, current)?;
        if events.is_empty() {
            return Ok(current);
        }
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let stream = state.streams.entry(aggregate_id).or_default();
        for (offset, event) in (1..).zip(events) {
            let mut event = event.clone();
            event.sequence_number = current + offset;
            stream.push(event);
        }
        state.outbox.extend_from_slice(outbox);

        Ok(current + events.len() as u64)
    }
}

#[async_trait]
impl OutboxRepository for InMemoryEventStore {
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxMessage>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .outbox
            .iter()
            .filter(|m| m.state.is_dispatchable() && m.next_attempt_at <= now)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_delivered(
        &self,
        message_id: Uuid,
        attempts: u32,
        delivered_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.update_message(message_id, |m| {
            m.state = DeliveryState::Delivered;
            m.attempts = attempts;
            m.delivered_at = Some(delivered_at);
        })
    }

    async fn schedule_retry(
        &self,
        message_id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), DomainError> {
        self.update_message(message_id, |m| {
            m.state = DeliveryState::Retrying;
            m.attempts = attempts;
            m.next_attempt_at = next_attempt_at;
            m.last_error = Some(error.to_owned());
        })
    }

    async fn mark_failed(
        &self,
        message_id: Uuid,
        attempts: u32,
        error: &str,
    ) -> Result<(), DomainError> {
        self.update_message(message_id, |m| {
            m.state = DeliveryState::FailedPermanently;
            m.attempts = attempts;
            m.last_error = Some(error.to_owned());
        })
    }

    async fn dead_letters(&self, limit: usize) -> Result<Vec<OutboxMessage>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .outbox
            .iter()
            .filter(|m| m.state == DeliveryState::FailedPermanently)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: ExpectedVersion,
        _events: &[StoredEvent],
        _outbox: &[OutboxMessage],
        _cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
