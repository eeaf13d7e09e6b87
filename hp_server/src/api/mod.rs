//! HTTP/WebSocket API for the poker server.
//!
//! The game itself is played over a single WebSocket per player; plain HTTP
//! only carries the health check.
//!
//! # Endpoints Overview
//!
//! - `GET /ws` - Upgrade to the game protocol (see [`websocket`])
//! - `GET /health` - Server health status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use hp_server::api::{create_router, AppState};
//! use house_poker::{RoomConfig, RoomManager};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let state = AppState {
//!     room_manager: Arc::new(RoomManager::new(RoomConfig::default())?),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod websocket;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use house_poker::RoomManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub room_manager: Arc<RoomManager>,
}

/// Create the API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"ok","rooms":3}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.room_manager.active_room_count().await;
    Json(json!({
        "status": "ok",
        "rooms": rooms,
    }))
}
