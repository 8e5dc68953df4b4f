//! Shared application state.

use std::fmt;
use std::sync::Arc;

use leaderboard_core::clock::Clock;
use leaderboard_core::concurrency::{ConcurrencyAwareStore, ConcurrencyMode};
use leaderboard_core::outbox::OutboxRepository;
use leaderboard_core::store::AggregateStore;
use leaderboard_core::version::ResourceVersions;
use leaderboard_players::domain::aggregates::Player;
use tokio_util::sync::CancellationToken;

/// Shared store of player aggregates.
pub type PlayerStore = Arc<dyn AggregateStore<Player>>;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for event timestamps.
    pub clock: Arc<dyn Clock>,
    /// The plain event-sourced player store. Handlers reach it through
    /// [`AppState::players`].
    pub player_store: PlayerStore,
    /// Outbox, for operator queries.
    pub outbox: Arc<dyn OutboxRepository>,
    /// What writes do without a usable `If-Match`.
    pub concurrency_mode: ConcurrencyMode,
    /// Parent of every request's cancellation token; see
    /// [`Lifecycle::requests_token`](crate::lifecycle::Lifecycle::requests_token).
    pub requests: CancellationToken,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("concurrency_mode", &self.concurrency_mode)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        player_store: PlayerStore,
        outbox: Arc<dyn OutboxRepository>,
        concurrency_mode: ConcurrencyMode,
        requests: CancellationToken,
    ) -> Self {
        Self {
            clock,
            player_store,
            outbox,
            concurrency_mode,
            requests,
        }
    }

    /// The player store as seen by one request.
    #[must_use]
    pub fn players(&self, versions: Arc<ResourceVersions>) -> ConcurrencyAwareStore<PlayerStore> {
        ConcurrencyAwareStore::for_request(
            Arc::clone(&self.player_store),
            versions,
            self.concurrency_mode,
        )
    }

    /// A cancellation token for one request. Shutdown cancels it only after
    /// the grace period.
    #[must_use]
    pub fn request_token(&self) -> CancellationToken {
        self.requests.child_token()
    }
}
