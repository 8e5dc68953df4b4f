//! Scripted transport and recording dead-letter sink for relay tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use leaderboard_core::outbox::OutboxMessage;
use leaderboard_outbox::dead_letter::DeadLetterSink;
use leaderboard_outbox::error::DeliveryFailure;
use leaderboard_outbox::transport::{Transport, TransportError};
use uuid::Uuid;

/// One recorded call to [`ScriptedTransport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: Uuid,
    pub destination: String,
    pub outcome: Result<(), TransportError>,
}

/// A transport that replays a queue of outcomes, then acknowledges
/// everything once the queue is empty.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<(), TransportError>>>,
    sent: Mutex<Vec<SentMessage>>,
}

impl ScriptedTransport {
    /// Creates a transport that acknowledges every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that answers with `outcomes` in order.
    #[must_use]
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<(), TransportError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            sent: Mutex::default(),
        }
    }

    /// Every send, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sends(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Ids of acknowledged sends, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn successful_sends(&self) -> Vec<Uuid> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.outcome.is_ok())
            .map(|s| s.message_id)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, message: &OutboxMessage) -> Result<(), TransportError> {
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        self.sent.lock().unwrap().push(SentMessage {
            message_id: message.message_id,
            destination: message.destination.clone(),
            outcome: outcome.clone(),
        });
        outcome
    }
}

/// A dead-letter sink that records what it receives.
#[derive(Debug, Default)]
pub struct RecordingDeadLetterSink {
    received: Mutex<Vec<(OutboxMessage, DeliveryFailure)>>,
}

impl RecordingDeadLetterSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dead-lettered so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn received(&self) -> Vec<(OutboxMessage, DeliveryFailure)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeadLetterSink for RecordingDeadLetterSink {
    async fn dead_letter(&self, message: &OutboxMessage, failure: &DeliveryFailure) {
        self.received
            .lock()
            .unwrap()
            .push((message.clone(), failure.clone()));
    }
}
