//! Two-phase server shutdown.
//!
//! The shutdown token stops new work (the listener and the outbox relay) as
//! soon as shutdown starts. Request tokens are cancelled separately, after a
//! grace period, so in-flight writes get the chance to commit.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancellation tokens for the server's shutdown phases.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    shutdown: CancellationToken,
    requests: CancellationToken,
}

impl Lifecycle {
    /// Creates a running lifecycle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancelled when shutdown begins.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Parent of every request's token; cancelled when the grace period
    /// runs out or the server has stopped.
    #[must_use]
    pub fn requests_token(&self) -> CancellationToken {
        self.requests.clone()
    }

    /// Starts shutdown: new work stops now, in-flight requests are cancelled
    /// once `grace` has elapsed unless [`finish`](Self::finish) comes first.
    pub fn begin_shutdown(&self, grace: Duration) -> JoinHandle<()> {
        self.shutdown.cancel();
        let requests = self.requests.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(grace) => {
                    tracing::warn!(
                        grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                        "shutdown grace period elapsed, cancelling in-flight requests"
                    );
                    requests.cancel();
                }
                () = requests.cancelled() => {}
            }
        })
    }

    /// Marks the server stopped, releasing anything still waiting.
    pub fn finish(&self) {
        self.shutdown.cancel();
        self.requests.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_outlive_the_start_of_shutdown() {
        // Arrange
        let lifecycle = Lifecycle::new();
        let request = lifecycle.requests_token().child_token();

        // Act
        let grace = lifecycle.begin_shutdown(Duration::from_secs(60));

        // Assert
        assert!(lifecycle.shutdown_token().is_cancelled());
        assert!(!request.is_cancelled());
        lifecycle.finish();
        grace.await.unwrap();
        assert!(request.is_cancelled());
    }

    #[tokio::test]
    async fn test_requests_are_cancelled_after_the_grace_period() {
        // Arrange
        let lifecycle = Lifecycle::new();
        let request = lifecycle.requests_token().child_token();

        // Act
        lifecycle
            .begin_shutdown(Duration::from_millis(20))
            .await
            .unwrap();

        // Assert
        assert!(request.is_cancelled());
    }
}
