//! Read-modify-write helpers over any [`AggregateStore`].

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::store::AggregateStore;

/// `get` and `get_and_update` for every aggregate store.
#[async_trait]
pub trait AggregateStoreExt<A: AggregateRoot>: AggregateStore<A> {
    /// Loads an aggregate that must exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no stream exists, or the
    /// store's own error.
    async fn get(&self, aggregate_id: Uuid, cancel: &CancellationToken) -> Result<A, DomainError> {
        self.find(aggregate_id, cancel)
            .await?
            .ok_or_else(|| DomainError::not_found::<A>(aggregate_id))
    }

    /// Loads the aggregate, applies `mutate`, and persists the result.
    ///
    /// Nothing is locked between the load and the write; the version check
    /// in `update` rejects a racing writer with `ConcurrencyConflict`. Callers
    /// retry by calling this again.
    ///
    /// # Errors
    ///
    /// Returns `AggregateNotFound`, the error from `mutate`, or the store's
    /// write error.
    async fn get_and_update<F>(
        &self,
        aggregate_id: Uuid,
        mutate: F,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError>
    where
        F: FnOnce(&mut A) -> Result<(), DomainError> + Send,
    {
        let mut aggregate = self.get(aggregate_id, cancel).await?;
        mutate(&mut aggregate)?;
        self.update(&mut aggregate, expected_version, cancel).await
    }
}

impl<A, S> AggregateStoreExt<A> for S
where
    A: AggregateRoot,
    S: AggregateStore<A> + ?Sized,
{
}
