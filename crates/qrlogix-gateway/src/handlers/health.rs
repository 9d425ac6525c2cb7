//! Liveness and counters.

use crate::router::AppState;
use axum::extract::State;
use axum::Json;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.app_name.as_ref(),
    }))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.metrics.to_json())
}
