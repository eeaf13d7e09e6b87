//! Integration tests for the HTTP surface of the server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use house_poker::{RoomConfig, RoomManager, entities::PlayerId};
use hp_server::api::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

fn create_test_server() -> (axum::Router, Arc<RoomManager>) {
    let room_manager = Arc::new(RoomManager::new(RoomConfig::default()).unwrap());
    let app = create_router(AppState {
        room_manager: room_manager.clone(),
    });
    (app, room_manager)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// === Health ===

#[tokio::test]
async fn test_health_check_reports_no_rooms() {
    let (app, _) = create_test_server();

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "rooms": 0}));
}

#[tokio::test]
async fn test_health_check_counts_rooms() {
    let (app, room_manager) = create_test_server();
    room_manager
        .create_room(PlayerId::from("alice"), "alice".into(), None)
        .await
        .unwrap();
    let code = room_manager
        .create_room(PlayerId::from("bob"), "bob".into(), Some(500))
        .await
        .unwrap();

    let (_, body) = get_json(app.clone(), "/health").await;
    assert_eq!(body["rooms"], 2);

    room_manager.close_room(code).await.unwrap();
    let (_, body) = get_json(app, "/health").await;
    assert_eq!(body["rooms"], 1);
}

// === Routing ===

#[tokio::test]
async fn test_websocket_route_requires_upgrade() {
    let (app, _) = create_test_server();

    let request = Request::builder().uri("/ws").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response.status().is_client_error(),
        "plain GET on /ws should be refused, got: {}",
        response.status()
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = create_test_server();

    let request = Request::builder()
        .uri("/api/tables")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
