//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub lobbies: usize,
    pub members: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        lobbies: state.lobbies.len(),
        members: state.sessions.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub lobbies: usize,
    pub members: usize,
    pub open_connections: usize,
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let open_connections = state
        .sessions
        .values()
        .iter()
        .filter(|m| m.connection.is_open())
        .count();

    Json(StatsResponse {
        lobbies: state.lobbies.len(),
        members: state.sessions.len(),
        open_connections,
    })
}
