//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("ars-orchestrator")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Events currently held in the ambiguity window
    pub window_len: usize,
    /// Most events the window holds
    pub window_capacity: usize,
    pub runs_completed: u64,
    pub runs_failed: u64,
    /// Last run failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let status = state.orchestrator.status().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "ars-orchestrator".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        window_len: status.window_len,
        window_capacity: status.window_capacity,
        runs_completed: status.runs_completed,
        runs_failed: status.runs_failed,
        last_error: status.last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
