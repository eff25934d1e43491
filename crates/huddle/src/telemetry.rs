//! Read-only operator endpoints.
//!
//! | route | body |
//! |---|---|
//! | `GET /health` | status, time, room and user counts |
//! | `GET /stats` | per-room counts and timestamps |
//! | `GET /rooms/{room_id}` | full room state, including camera rotations |
//!
//! Handlers only read through room actors, so they never block a room for
//! longer than a snapshot takes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use huddle_protocol::RoomId;
use huddle_room::{Registry, RoomInfo, RoomSnapshot};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
    active_rooms: usize,
    total_users: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    total_rooms: usize,
    total_users: usize,
    rooms: Vec<RoomInfo>,
}

/// Builds the telemetry router over `registry`.
pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/rooms/{room_id}", get(room_detail))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn health(State(registry): State<Registry>) -> Json<Health> {
    let rooms = registry.stats().await;
    Json(Health {
        status: "healthy",
        timestamp: Utc::now(),
        active_rooms: rooms.len(),
        total_users: rooms.iter().map(|r| r.user_count).sum(),
    })
}

async fn stats(State(registry): State<Registry>) -> Json<Stats> {
    let rooms = registry.stats().await;
    Json(Stats {
        total_rooms: rooms.len(),
        total_users: rooms.iter().map(|r| r.user_count).sum(),
        rooms,
    })
}

async fn room_detail(
    State(registry): State<Registry>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>, StatusCode> {
    let room_id = RoomId::new(room_id).ok_or(StatusCode::NOT_FOUND)?;
    registry
        .snapshot(&room_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
