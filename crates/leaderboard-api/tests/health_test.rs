//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;
use leaderboard_core::concurrency::ConcurrencyMode;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::build_test_app();

    let response = common::get_json(app.router, "/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["status"], "ok");
    assert!(response.json["version"].is_string());
    assert_eq!(response.json["unversioned_writes"], false);
}

#[tokio::test]
async fn test_health_reports_relaxed_mode() {
    let app = common::build_test_app_with_mode(ConcurrencyMode::Relaxed);

    let response = common::get_json(app.router, "/health").await;

    assert_eq!(response.json["unversioned_writes"], true);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
