//! Resource-version propagation across a request boundary.
//!
//! A request carries the version its caller last saw (`expected`) and its
//! response carries the version produced by the write (`next`). Both travel
//! as the decimal string of a `u64`. The store never sees this boundary;
//! only [`ConcurrencyAwareStore`](crate::concurrency::ConcurrencyAwareStore)
//! reads and writes these providers.

use std::sync::{Mutex, PoisonError};

/// Supplies the version token extracted from the inbound request.
pub trait ExpectedVersionProvider: Send + Sync {
    /// The raw token, or `None` if the caller supplied none.
    fn value(&self) -> Option<String>;
}

/// Receives the version produced by a write, for the outbound response.
pub trait NextVersionProvider: Send + Sync {
    /// Records `value`. Returns `false` when there is no response boundary
    /// to carry it.
    fn try_set(&self, value: String) -> bool;
}

/// Request-scoped resource versions.
///
/// Created at request start and dropped with the request, so concurrent
/// requests never share one.
#[derive(Debug, Default)]
pub struct ResourceVersions {
    expected: Option<String>,
    next: Mutex<Option<String>>,
}

impl ResourceVersions {
    /// Creates the context for one request.
    #[must_use]
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected,
            next: Mutex::new(None),
        }
    }

    /// The next-version token recorded during the request, if any.
    #[must_use]
    pub fn next(&self) -> Option<String> {
        self.next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExpectedVersionProvider for ResourceVersions {
    fn value(&self) -> Option<String> {
        self.expected.clone()
    }
}

impl NextVersionProvider for ResourceVersions {
    fn try_set(&self, value: String) -> bool {
        let mut next = self
            .next
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *next = Some(value);
        true
    }
}

/// Providers for work with no request boundary, such as background jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl ExpectedVersionProvider for Detached {
    fn value(&self) -> Option<String> {
        None
    }
}

impl NextVersionProvider for Detached {
    fn try_set(&self, _value: String) -> bool {
        false
    }
}

/// Parses a resource version token. Blank or non-decimal tokens yield `None`.
#[must_use]
pub fn parse_resource_version(token: &str) -> Option<u64> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Formats a version as a resource version token.
#[must_use]
pub fn format_resource_version(version: u64) -> String {
    version.to_string()
}
