//! Health endpoint for the streaming server

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::server::AppState;

/// Report server health and the current per-session load snapshot.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.gateway.pool().load_snapshot();

    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.server_started_at.elapsed().as_secs(),
        "sessions": sessions,
    }))
}
