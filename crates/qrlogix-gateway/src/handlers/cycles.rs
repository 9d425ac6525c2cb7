//! Open cycles board, supervisor actions and the dashboard.

use super::ApiJson;
use crate::domain::ApiResult;
use crate::router::AppState;
use axum::extract::State;
use axum::Json;
use qrlogix_tracking::{DashboardSummary, ManualActionRequest, OpenCycleView};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct OpenCyclesResponse {
    pub total: usize,
    pub ciclos: Vec<OpenCycleView>,
}

/// GET /ciclos
pub async fn open_cycles(State(state): State<AppState>) -> ApiResult<Json<OpenCyclesResponse>> {
    let ciclos = state.checkin.open_cycles().await?;
    Ok(Json(OpenCyclesResponse {
        total: ciclos.len(),
        ciclos,
    }))
}

/// POST /ciclos/accion
pub async fn manual_action(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ManualActionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = state.checkin.apply_manual_action(request).await?;
    state.metrics.record_manual_action();

    Ok(Json(serde_json::json!({
        "success": true,
        "msg": result.msg,
    })))
}

/// GET /tablero
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(state.checkin.dashboard_summary().await?))
}
