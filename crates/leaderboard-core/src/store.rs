//! Aggregate store: loads aggregates by replaying their streams and persists
//! their uncommitted events with an expected-version check.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregate::{AggregateRoot, reconstitute};
use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::to_stored_event;
use crate::outbox::{OutboxMessage, OutboxRoute};
use crate::repository::{EventRepository, ExpectedVersion, StoredEvent};

/// Loads and persists aggregates of type `A`.
///
/// Every write drains the aggregate's uncommitted events and, on success,
/// advances its committed version to the returned version.
#[async_trait]
pub trait AggregateStore<A: AggregateRoot>: Send + Sync {
    /// Replays the stream for `aggregate_id`. `None` if no stream exists.
    async fn find(
        &self,
        aggregate_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<A>, DomainError>;

    /// Persists the aggregate as a brand-new stream.
    ///
    /// Fails with `StreamAlreadyExists` if the identity is taken.
    async fn add(&self, aggregate: &mut A, cancel: &CancellationToken) -> Result<u64, DomainError>;

    /// Appends uncommitted events.
    ///
    /// With `Some(v)` the append only happens if the stream is at exactly `v`,
    /// otherwise `ConcurrencyConflict`. With `None` the append is
    /// unconditional and no conflict detection occurs.
    async fn update(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError>;

    /// Records the aggregate's deletion marker, then appends like `update`.
    async fn delete(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError>;
}

#[async_trait]
impl<A, S> AggregateStore<A> for Arc<S>
where
    A: AggregateRoot,
    S: AggregateStore<A> + ?Sized,
{
    async fn find(
        &self,
        aggregate_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<A>, DomainError> {
        (**self).find(aggregate_id, cancel).await
    }

    async fn add(&self, aggregate: &mut A, cancel: &CancellationToken) -> Result<u64, DomainError> {
        (**self).add(aggregate, cancel).await
    }

    async fn update(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        (**self).update(aggregate, expected_version, cancel).await
    }

    async fn delete(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        (**self).delete(aggregate, expected_version, cancel).await
    }
}

/// Event-sourced [`AggregateStore`] over an [`EventRepository`].
///
/// Appended events are offered to the [`OutboxRoute`]; routed events become
/// outbox messages committed in the same append.
pub struct EventSourcedStore<A> {
    repository: Arc<dyn EventRepository>,
    route: Arc<dyn OutboxRoute>,
    clock: Arc<dyn Clock>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> fmt::Debug for EventSourcedStore<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSourcedStore").finish_non_exhaustive()
    }
}

impl<A> Clone for EventSourcedStore<A> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            route: Arc::clone(&self.route),
            clock: Arc::clone(&self.clock),
            _aggregate: PhantomData,
        }
    }
}

impl<A: AggregateRoot> EventSourcedStore<A> {
    /// Creates a new `EventSourcedStore`.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository>,
        route: Arc<dyn OutboxRoute>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            route,
            clock,
            _aggregate: PhantomData,
        }
    }

    async fn persist(
        &self,
        aggregate: &mut A,
        expected_version: ExpectedVersion,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        let aggregate_id = aggregate.aggregate_id();
        let events: Vec<StoredEvent> = aggregate
            .take_uncommitted_events()
            .iter()
            .map(to_stored_event)
            .collect();

        let now = self.clock.now();
        let outbox: Vec<OutboxMessage> = events
            .iter()
            .filter_map(|event| {
                self.route
                    .destination(event)
                    .map(|destination| OutboxMessage::capture(event, destination, now))
            })
            .collect();

        let next_version = self
            .repository
            .append_events(aggregate_id, expected_version, &events, &outbox, cancel)
            .await
            .inspect_err(|e| {
                tracing::debug!(
                    aggregate_type = A::AGGREGATE_TYPE,
                    aggregate_id = %aggregate_id,
                    ?expected_version,
                    error = %e,
                    "append rejected"
                );
            })?;
        aggregate.mark_committed(next_version);

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate_id,
            ?expected_version,
            next_version,
            event_count = events.len(),
            outbox_count = outbox.len(),
            "appended events"
        );

        Ok(next_version)
    }
}

#[async_trait]
impl<A: AggregateRoot> AggregateStore<A> for EventSourcedStore<A> {
    async fn find(
        &self,
        aggregate_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<A>, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        let stored_events = self.repository.load_events(aggregate_id).await?;
        if stored_events.is_empty() {
            return Ok(None);
        }
        reconstitute(aggregate_id, &stored_events).map(Some)
    }

    async fn add(&self, aggregate: &mut A, cancel: &CancellationToken) -> Result<u64, DomainError> {
        if aggregate.uncommitted_events().is_empty() {
            return Err(DomainError::Validation(format!(
                "cannot add {} {} without events",
                A::AGGREGATE_TYPE,
                aggregate.aggregate_id()
            )));
        }
        self.persist(aggregate, ExpectedVersion::NoStream, cancel)
            .await
    }

    async fn update(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        self.persist(aggregate, ExpectedVersion::from_option(expected_version), cancel)
            .await
    }

    async fn delete(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        if !aggregate.is_deleted() {
            aggregate.mark_deleted(Uuid::new_v4(), self.clock.as_ref());
        }
        self.persist(aggregate, ExpectedVersion::from_option(expected_version), cancel)
            .await
    }
}
