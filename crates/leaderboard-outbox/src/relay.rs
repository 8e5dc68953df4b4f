//! Outbox relay: the background dispatch loop.
//!
//! Each pass fetches due messages in enqueue order, groups them by
//! destination, and dispatches the groups concurrently while keeping each
//! group sequential. A message is marked `delivered` only after the
//! transport acknowledges it, so a crash between send and acknowledgement
//! leads to redelivery.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use leaderboard_core::clock::{self, Clock};
use leaderboard_core::error::DomainError;
use leaderboard_core::outbox::{DeliveryState, OutboxMessage, OutboxRepository};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::dead_letter::DeadLetterSink;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::Transport;

/// Relay scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Time between dispatch passes.
    pub dispatch_interval: Duration,
    /// Maximum messages fetched per pass.
    pub batch_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_secs(1),
            batch_size: 100,
        }
    }
}

/// Counts of what one dispatch pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages acknowledged by the transport.
    pub delivered: usize,
    /// Messages rescheduled after a transient failure.
    pub retried: usize,
    /// Messages moved to `failed-permanently`.
    pub dead_lettered: usize,
    /// Messages left untouched because the pass was cancelled or a storage
    /// error stopped their destination group.
    pub skipped: usize,
}

impl DispatchReport {
    /// Whether the pass touched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn merge(mut self, other: Self) -> Self {
        self.delivered += other.delivered;
        self.retried += other.retried;
        self.dead_lettered += other.dead_lettered;
        self.skipped += other.skipped;
        self
    }
}

enum Outcome {
    Delivered,
    Retried,
    DeadLettered,
}

/// Delivers outbox messages to a [`Transport`].
pub struct OutboxRelay {
    outbox: Arc<dyn OutboxRepository>,
    transport: Arc<dyn Transport>,
    dead_letters: Arc<dyn DeadLetterSink>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    config: RelayConfig,
}

impl fmt::Debug for OutboxRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboxRelay")
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OutboxRelay {
    /// Creates a new `OutboxRelay`.
    #[must_use]
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        transport: Arc<dyn Transport>,
        dead_letters: Arc<dyn DeadLetterSink>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        config: RelayConfig,
    ) -> Self {
        Self {
            outbox,
            transport,
            dead_letters,
            clock,
            policy,
            config,
        }
    }

    /// Spawns [`run`](Self::run) on the tokio runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Runs dispatch passes on a fixed interval until `shutdown` is cancelled.
    ///
    /// Pass errors are logged and the loop carries on; outbox failures never
    /// reach the writers that enqueued the messages.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.dispatch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let interval_ms =
            u64::try_from(self.config.dispatch_interval.as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            interval_ms,
            batch_size = self.config.batch_size,
            max_attempts = self.policy.max_attempts,
            "outbox relay started"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.dispatch_pass(&shutdown).await {
                Ok(report) if !report.is_empty() => {
                    tracing::info!(
                        delivered = report.delivered,
                        retried = report.retried,
                        dead_lettered = report.dead_lettered,
                        skipped = report.skipped,
                        "outbox dispatch pass finished"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "outbox dispatch pass failed"),
            }
        }

        tracing::info!("outbox relay stopped");
    }

    /// Runs one dispatch pass over the messages due now.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the due messages cannot be fetched. Storage
    /// errors while recording an outcome stop that destination's group and
    /// are logged; the untouched messages stay due for the next pass.
    pub async fn dispatch_pass(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<DispatchReport, DomainError> {
        let due = self
            .outbox
            .fetch_due(self.clock.now(), self.config.batch_size)
            .await?;
        if due.is_empty() {
            return Ok(DispatchReport::default());
        }

        let mut groups: Vec<Vec<OutboxMessage>> = Vec::new();
        for message in due {
            match groups
                .iter_mut()
                .find(|group| group[0].destination == message.destination)
            {
                Some(group) => group.push(message),
                None => groups.push(vec![message]),
            }
        }

        let reports = join_all(
            groups
                .into_iter()
                .map(|group| self.dispatch_group(group, shutdown)),
        )
        .await;

        Ok(reports
            .into_iter()
            .fold(DispatchReport::default(), DispatchReport::merge))
    }

    async fn dispatch_group(
        &self,
        messages: Vec<OutboxMessage>,
        shutdown: &CancellationToken,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let total = messages.len();

        for (index, message) in messages.into_iter().enumerate() {
            if shutdown.is_cancelled() {
                report.skipped += total - index;
                break;
            }

            let message_id = message.message_id;
            let destination = message.destination.clone();
            match self.deliver(message).await {
                Ok(Outcome::Delivered) => report.delivered += 1,
                Ok(Outcome::Retried) => report.retried += 1,
                Ok(Outcome::DeadLettered) => report.dead_lettered += 1,
                Err(e) => {
                    tracing::error!(
                        message_id = %message_id,
                        destination = %destination,
                        error = %e,
                        "failed to record outbox delivery outcome"
                    );
                    report.skipped += total - index;
                    break;
                }
            }
        }

        report
    }

    async fn deliver(&self, mut message: OutboxMessage) -> Result<Outcome, DomainError> {
        let attempts = message.attempts + 1;

        let error = match self.transport.send(&message).await {
            Ok(()) => {
                self.outbox
                    .mark_delivered(message.message_id, attempts, self.clock.now())
                    .await?;
                tracing::debug!(
                    message_id = %message.message_id,
                    destination = %message.destination,
                    attempts,
                    "outbox message delivered"
                );
                return Ok(Outcome::Delivered);
            }
            Err(error) => error,
        };

        match self.policy.decide(attempts, &error) {
            RetryDecision::RetryAfter(delay) => {
                let failure = self.policy.classify(attempts, &error);
                let next_attempt_at = clock::after(self.clock.now(), delay);
                self.outbox
                    .schedule_retry(
                        message.message_id,
                        attempts,
                        next_attempt_at,
                        &failure.to_string(),
                    )
                    .await?;
                tracing::warn!(
                    message_id = %message.message_id,
                    destination = %message.destination,
                    attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    failure = %failure,
                    "outbox delivery failed, retry scheduled"
                );
                Ok(Outcome::Retried)
            }
            RetryDecision::GiveUp(failure) => {
                let reason = failure.to_string();
                self.outbox
                    .mark_failed(message.message_id, attempts, &reason)
                    .await?;
                message.state = DeliveryState::FailedPermanently;
                message.attempts = attempts;
                message.last_error = Some(reason);
                self.dead_letters.dead_letter(&message, &failure).await;
                Ok(Outcome::DeadLettered)
            }
        }
    }
}
