//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use leaderboard_api::build_router;
use leaderboard_api::state::AppState;
use leaderboard_core::clock::Clock;
use leaderboard_core::concurrency::ConcurrencyMode;
use leaderboard_core::store::EventSourcedStore;
use leaderboard_players::domain::aggregates::Player;
use leaderboard_players::integration::PlayerOutboxRoute;
use leaderboard_test_support::{FixedClock, InMemoryEventStore};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// The app under test plus the store behind it.
pub struct TestApp {
    pub router: Router,
    pub events: Arc<InMemoryEventStore>,
}

/// Builds the full app router over an in-memory event store with strict
/// concurrency.
pub fn build_test_app() -> TestApp {
    build_test_app_with_mode(ConcurrencyMode::Strict)
}

/// Builds the full app router with the given concurrency mode.
pub fn build_test_app_with_mode(mode: ConcurrencyMode) -> TestApp {
    let clock = fixed_clock();
    let events = Arc::new(InMemoryEventStore::new());
    let players = Arc::new(EventSourcedStore::<Player>::new(
        Arc::clone(&events) as _,
        Arc::new(PlayerOutboxRoute),
        Arc::clone(&clock),
    ));
    let app_state = AppState::new(
        clock,
        players,
        Arc::clone(&events) as _,
        mode,
        CancellationToken::new(),
    );

    TestApp {
        router: build_router(app_state),
        events,
    }
}

/// A response reduced to what the tests look at.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: serde_json::Value,
}

impl TestResponse {
    /// The `ETag` header, if any.
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get("etag")
            .map(|value| value.to_str().unwrap())
    }
}

/// Sends a request with optional JSON body and extra headers.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    TestResponse {
        status,
        headers,
        json,
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: &serde_json::Value) -> TestResponse {
    send(app, "POST", uri, Some(body), &[]).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> TestResponse {
    send(app, "GET", uri, None, &[]).await
}

/// Creates a player and returns its ID.
pub async fn create_player(app: Router, display_name: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/players",
        &serde_json::json!({ "display_name": display_name }),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.json["player_id"].as_str().unwrap().to_owned()
}
