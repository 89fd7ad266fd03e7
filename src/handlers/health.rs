use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::config::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// GET /health/live — the process is up; no dependencies checked.
pub async fn liveness_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "live" })
}

/// GET /health/ready — the process can serve traffic, i.e. the database is
/// reachable within a 5-second ceiling.
pub async fn readiness_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ping = tokio::time::timeout(Duration::from_secs(5), sqlx::query("SELECT 1").execute(&state.pool));

    match ping.await {
        Ok(Ok(_)) => (StatusCode::OK, Json(HealthResponse { status: "ready" })),
        _ => (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: "not_ready" })),
    }
}
