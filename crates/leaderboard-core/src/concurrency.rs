//! Optimistic-concurrency decorator for aggregate stores.
//!
//! Maps the request's resource-version protocol onto the store's native
//! expected-version parameter so handlers never parse or format tokens.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::store::AggregateStore;
use crate::version::{
    Detached, ExpectedVersionProvider, NextVersionProvider, ResourceVersions,
    format_resource_version, parse_resource_version,
};

/// What `update`/`delete` do when neither the caller nor the request
/// supplies a usable expected version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Check against the version the aggregate was loaded at; reject
    /// unparseable tokens with `InvalidResourceVersion`.
    #[default]
    Strict,
    /// Intentional relaxed-consistency path: a missing or unparseable token
    /// means an unconditional, last-writer-wins append. Opt-in only.
    Relaxed,
}

/// [`AggregateStore`] decorator that injects the request's expected version
/// and publishes the resulting version.
///
/// Build one per request around the shared inner store.
pub struct ConcurrencyAwareStore<S> {
    inner: S,
    expected: Arc<dyn ExpectedVersionProvider>,
    next: Arc<dyn NextVersionProvider>,
    mode: ConcurrencyMode,
}

impl<S> fmt::Debug for ConcurrencyAwareStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyAwareStore")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<S> ConcurrencyAwareStore<S> {
    /// Wraps `inner` with explicit providers.
    #[must_use]
    pub fn new(
        inner: S,
        expected: Arc<dyn ExpectedVersionProvider>,
        next: Arc<dyn NextVersionProvider>,
        mode: ConcurrencyMode,
    ) -> Self {
        Self {
            inner,
            expected,
            next,
            mode,
        }
    }

    /// Wraps `inner` with one request's resource versions.
    #[must_use]
    pub fn for_request(inner: S, versions: Arc<ResourceVersions>, mode: ConcurrencyMode) -> Self {
        let expected: Arc<dyn ExpectedVersionProvider> = versions.clone();
        let next: Arc<dyn NextVersionProvider> = versions;
        Self::new(inner, expected, next, mode)
    }

    /// Wraps `inner` for work outside any request.
    #[must_use]
    pub fn detached(inner: S, mode: ConcurrencyMode) -> Self {
        Self::new(inner, Arc::new(Detached), Arc::new(Detached), mode)
    }

    /// Resolves the version to check: explicit argument, then the request
    /// token, then the mode's fallback.
    fn resolve_expected_version(
        &self,
        explicit: Option<u64>,
        loaded_version: u64,
    ) -> Result<Option<u64>, DomainError> {
        if explicit.is_some() {
            return Ok(explicit);
        }

        let token = self
            .expected
            .value()
            .filter(|token| !token.trim().is_empty());

        match (token, self.mode) {
            (Some(token), mode) => match parse_resource_version(&token) {
                Some(version) => Ok(Some(version)),
                None if mode == ConcurrencyMode::Strict => {
                    Err(DomainError::InvalidResourceVersion(token))
                }
                None => {
                    tracing::warn!(
                        token = %token,
                        "unparseable resource version, writing without a version check"
                    );
                    Ok(None)
                }
            },
            (None, ConcurrencyMode::Strict) => Ok(Some(loaded_version)),
            (None, ConcurrencyMode::Relaxed) => Ok(None),
        }
    }

    fn publish(&self, version: u64) {
        if !self.next.try_set(format_resource_version(version)) {
            tracing::trace!(version, "no response boundary for next resource version");
        }
    }
}

#[async_trait]
impl<A, S> AggregateStore<A> for ConcurrencyAwareStore<S>
where
    A: AggregateRoot,
    S: AggregateStore<A>,
{
    async fn find(
        &self,
        aggregate_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<A>, DomainError> {
        self.inner.find(aggregate_id, cancel).await
    }

    async fn add(&self, aggregate: &mut A, cancel: &CancellationToken) -> Result<u64, DomainError> {
        let next_version = self.inner.add(aggregate, cancel).await?;
        self.publish(next_version);
        Ok(next_version)
    }

    async fn update(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        let expected_version =
            self.resolve_expected_version(expected_version, aggregate.version())?;
        let next_version = self.inner.update(aggregate, expected_version, cancel).await?;
        self.publish(next_version);
        Ok(next_version)
    }

    async fn delete(
        &self,
        aggregate: &mut A,
        expected_version: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        let expected_version =
            self.resolve_expected_version(expected_version, aggregate.version())?;
        let next_version = self.inner.delete(aggregate, expected_version, cancel).await?;
        self.publish(next_version);
        Ok(next_version)
    }
}
