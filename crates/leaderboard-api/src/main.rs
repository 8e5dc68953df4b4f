//! Leaderboard API server entry point.

use std::sync::Arc;
use std::time::Duration;

use leaderboard_api::build_router;
use leaderboard_api::config::AppConfig;
use leaderboard_api::error::AppError;
use leaderboard_api::lifecycle::Lifecycle;
use leaderboard_api::state::AppState;
use leaderboard_core::clock::{Clock, SystemClock};
use leaderboard_core::outbox::OutboxRepository;
use leaderboard_core::store::EventSourcedStore;
use leaderboard_event_store::pg_event_repository::PgEventRepository;
use leaderboard_event_store::pg_outbox_repository::PgOutboxRepository;
use leaderboard_outbox::dead_letter::TracingDeadLetterSink;
use leaderboard_outbox::http::HttpTransport;
use leaderboard_outbox::relay::OutboxRelay;
use leaderboard_players::domain::aggregates::Player;
use leaderboard_players::integration::PlayerOutboxRoute;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting leaderboard API server");

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr()?;

    // Schema migrations run out of band; the server expects them applied.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let outbox: Arc<dyn OutboxRepository> = Arc::new(
        PgOutboxRepository::new(pool.clone()).with_claim_lease(config.outbox_claim_lease),
    );
    let players = Arc::new(EventSourcedStore::<Player>::new(
        Arc::new(PgEventRepository::new(pool)),
        Arc::new(PlayerOutboxRoute),
        Arc::clone(&clock),
    ));

    let lifecycle = Lifecycle::new();

    let transport =
        HttpTransport::new(config.transport_base_url.clone(), config.transport_timeout)?;
    let relay = OutboxRelay::new(
        Arc::clone(&outbox),
        Arc::new(transport),
        Arc::new(TracingDeadLetterSink),
        Arc::clone(&clock),
        config.retry.clone(),
        config.relay.clone(),
    )
    .spawn(lifecycle.shutdown_token());

    let app_state = AppState::new(
        clock,
        players,
        outbox,
        config.concurrency_mode,
        lifecycle.requests_token(),
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(
        %addr,
        concurrency_mode = ?config.concurrency_mode,
        "listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(lifecycle.clone(), config.shutdown_grace))
        .await?;

    lifecycle.finish();
    if let Err(error) = relay.await {
        tracing::error!(%error, "outbox relay task failed");
    }
    tracing::info!("server stopped");

    Ok(())
}

/// Resolves on Ctrl-C and starts the two-phase shutdown: the relay stops
/// at once, in-flight requests get `grace` to finish.
async fn shutdown_signal(lifecycle: Lifecycle, grace: Duration) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
    tracing::info!(
        grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
        "shutdown requested"
    );
    // The grace task ends on its own once `finish` cancels the requests.
    drop(lifecycle.begin_shutdown(grace));
}
