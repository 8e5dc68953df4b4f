//! Integration tests for the Players routes and `If-Match` / `ETag` handling.

mod common;

use axum::http::StatusCode;
use leaderboard_core::concurrency::ConcurrencyMode;
use leaderboard_core::outbox::{DeliveryState, OutboxRepository};
use uuid::Uuid;

fn game_event(points: i64) -> serde_json::Value {
    serde_json::json!({ "points": points })
}

#[tokio::test]
async fn test_create_player_returns_201_location_and_etag() {
    // Arrange
    let app = common::build_test_app();

    // Act
    let response = common::post_json(
        app.router.clone(),
        "/api/v1/players",
        &serde_json::json!({ "display_name": "  Ada  " }),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.etag(), Some("\"1\""));
    assert_eq!(response.json["version"], 1);
    let player_id = response.json["player_id"].as_str().unwrap();
    assert_eq!(
        response.headers.get("location").unwrap(),
        format!("/api/v1/players/{player_id}").as_str()
    );
    let player_id: Uuid = player_id.parse().unwrap();
    assert_eq!(app.events.stream_version(player_id), 1);
}

#[tokio::test]
async fn test_get_player_returns_view_with_etag() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    let response =
        common::get_json(app.router.clone(), &format!("/api/v1/players/{player_id}")).await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.etag(), Some("\"1\""));
    assert_eq!(response.json["player_id"], player_id);
    assert_eq!(response.json["display_name"], "Ada");
    assert_eq!(response.json["total_score"], 0);
    assert_eq!(response.json["game_event_count"], 0);
    assert_eq!(response.json["version"], 1);
}

#[tokio::test]
async fn test_game_event_with_current_if_match_returns_next_etag() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    let response = common::send(
        app.router.clone(),
        "POST",
        &format!("/api/v1/players/{player_id}/game-events"),
        Some(&game_event(25)),
        &[("if-match", "\"1\"")],
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.etag(), Some("\"2\""));
    assert_eq!(response.json["version"], 2);

    let view = common::get_json(app.router.clone(), &format!("/api/v1/players/{player_id}")).await;
    assert_eq!(view.json["total_score"], 25);
    assert_eq!(view.json["game_event_count"], 1);
}

#[tokio::test]
async fn test_game_event_with_stale_if_match_returns_409() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;
    let uri = format!("/api/v1/players/{player_id}/game-events");
    let first = common::send(
        app.router.clone(),
        "POST",
        &uri,
        Some(&game_event(10)),
        &[("if-match", "\"1\"")],
    )
    .await;
    assert_eq!(first.status, StatusCode::OK);

    // Act
    let response = common::send(
        app.router.clone(),
        "POST",
        &uri,
        Some(&game_event(5)),
        &[("if-match", "\"1\"")],
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json["error"], "concurrency_conflict");
    assert_eq!(response.etag(), None);
    assert_eq!(app.events.stream_version(player_id.parse().unwrap()), 2);
}

#[tokio::test]
async fn test_weak_if_match_is_accepted() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    let response = common::send(
        app.router.clone(),
        "POST",
        &format!("/api/v1/players/{player_id}/game-events"),
        Some(&game_event(1)),
        &[("if-match", "W/\"1\"")],
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.etag(), Some("\"2\""));
}

#[tokio::test]
async fn test_unparseable_if_match_returns_400_in_strict_mode() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    let response = common::send(
        app.router.clone(),
        "POST",
        &format!("/api/v1/players/{player_id}/game-events"),
        Some(&game_event(1)),
        &[("if-match", "\"not-a-version\"")],
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "invalid_resource_version");
    assert_eq!(app.events.stream_version(player_id.parse().unwrap()), 1);
}

#[tokio::test]
async fn test_strict_mode_without_if_match_checks_loaded_version() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    let response = common::post_json(
        app.router.clone(),
        &format!("/api/v1/players/{player_id}/game-events"),
        &game_event(3),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.etag(), Some("\"2\""));
}

#[tokio::test]
async fn test_relaxed_mode_ignores_unparseable_if_match() {
    // Arrange
    let app = common::build_test_app_with_mode(ConcurrencyMode::Relaxed);
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    let response = common::send(
        app.router.clone(),
        "POST",
        &format!("/api/v1/players/{player_id}/game-events"),
        Some(&game_event(7)),
        &[("if-match", "garbage")],
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.etag(), Some("\"2\""));
}

#[tokio::test]
async fn test_unknown_player_returns_404() {
    // Arrange
    let app = common::build_test_app();

    // Act
    let response = common::get_json(
        app.router.clone(),
        &format!("/api/v1/players/{}", Uuid::new_v4()),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json["error"], "aggregate_not_found");
}

#[tokio::test]
async fn test_blank_display_name_returns_400() {
    // Arrange
    let app = common::build_test_app();

    // Act
    let response = common::post_json(
        app.router.clone(),
        "/api/v1/players",
        &serde_json::json!({ "display_name": "   " }),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "validation_error");
    assert!(app.events.outbox_messages().is_empty());
}

#[tokio::test]
async fn test_negative_points_return_400() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    let response = common::post_json(
        app.router.clone(),
        &format!("/api/v1/players/{player_id}/game-events"),
        &game_event(-4),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "validation_error");
}

#[tokio::test]
async fn test_score_overflow_returns_400() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;
    let uri = format!("/api/v1/players/{player_id}/game-events");
    let first = common::post_json(app.router.clone(), &uri, &game_event(i64::MAX)).await;
    assert_eq!(first.status, StatusCode::OK);

    // Act
    let response = common::post_json(app.router.clone(), &uri, &game_event(1)).await;

    // Assert
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "validation_error");
    assert_eq!(app.events.stream_version(player_id.parse().unwrap()), 2);
}

#[tokio::test]
async fn test_delete_player_then_get_returns_404() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;
    let uri = format!("/api/v1/players/{player_id}");

    // Act
    let deleted = common::send(app.router.clone(), "DELETE", &uri, None, &[("if-match", "\"1\"")])
        .await;

    // Assert
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(deleted.etag(), Some("\"2\""));
    let response = common::get_json(app.router.clone(), &uri).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_with_stale_if_match_returns_409() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;
    let uri = format!("/api/v1/players/{player_id}");
    common::post_json(app.router.clone(), &format!("{uri}/game-events"), &game_event(1)).await;

    // Act
    let response =
        common::send(app.router.clone(), "DELETE", &uri, None, &[("if-match", "\"1\"")]).await;

    // Assert
    assert_eq!(response.status, StatusCode::CONFLICT);
    let view = common::get_json(app.router.clone(), &uri).await;
    assert_eq!(view.status, StatusCode::OK);
}

#[tokio::test]
async fn test_correlation_id_header_is_recorded_on_events() {
    // Arrange
    let app = common::build_test_app();
    let correlation_id = Uuid::new_v4();
    let correlation_header = correlation_id.to_string();

    // Act
    let response = common::send(
        app.router.clone(),
        "POST",
        "/api/v1/players",
        Some(&serde_json::json!({ "display_name": "Ada" })),
        &[("x-correlation-id", correlation_header.as_str())],
    )
    .await;

    // Assert
    let player_id: Uuid = response.json["player_id"].as_str().unwrap().parse().unwrap();
    let events = app.events.events(player_id);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].correlation_id, correlation_id);
}

#[tokio::test]
async fn test_writes_enqueue_outbox_messages_per_destination() {
    // Arrange
    let app = common::build_test_app();
    let player_id = common::create_player(app.router.clone(), "Ada").await;

    // Act
    common::post_json(
        app.router.clone(),
        &format!("/api/v1/players/{player_id}/game-events"),
        &game_event(9),
    )
    .await;

    // Assert
    let destinations: Vec<String> = app
        .events
        .outbox_messages()
        .into_iter()
        .map(|message| message.destination)
        .collect();
    assert_eq!(destinations, vec!["players", "game-events"]);
}

#[tokio::test]
async fn test_dead_letters_endpoint_lists_failed_messages() {
    // Arrange
    let app = common::build_test_app();
    common::create_player(app.router.clone(), "Ada").await;
    common::create_player(app.router.clone(), "Grace").await;
    let messages = app.events.outbox_messages();
    app.events
        .mark_failed(messages[0].message_id, 5, "gateway timeout")
        .await
        .unwrap();

    // Act
    let response = common::get_json(app.router.clone(), "/api/v1/outbox/dead-letters").await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    let dead_letters = response.json.as_array().unwrap();
    assert_eq!(dead_letters.len(), 1);
    assert_eq!(
        dead_letters[0]["message_id"],
        messages[0].message_id.to_string()
    );
    assert_eq!(
        dead_letters[0]["state"],
        DeliveryState::FailedPermanently.as_str()
    );
    assert_eq!(dead_letters[0]["attempts"], 5);
    assert_eq!(dead_letters[0]["last_error"], "gateway timeout");
}

#[tokio::test]
async fn test_dead_letters_endpoint_honours_limit() {
    // Arrange
    let app = common::build_test_app();
    common::create_player(app.router.clone(), "Ada").await;
    common::create_player(app.router.clone(), "Grace").await;
    for message in app.events.outbox_messages() {
        app.events
            .mark_failed(message.message_id, 1, "rejected")
            .await
            .unwrap();
    }

    // Act
    let response =
        common::get_json(app.router.clone(), "/api/v1/outbox/dead-letters?limit=1").await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json.as_array().unwrap().len(), 1);
}
