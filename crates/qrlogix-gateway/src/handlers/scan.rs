//! Checkpoint scans.

use super::{FormOrJson, PlateForm};
use crate::domain::ApiResult;
use crate::router::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qrlogix_tracking::{new_device_cookie, Checkpoint, CycleOutcome, ScanOutcome, TrackingError};
use tracing::debug;

/// GET /scan/:punto
///
/// Devices with an active session are checked in straight away; anyone else
/// is asked for the plate.
pub async fn scan_get(
    State(state): State<AppState>,
    Path(punto): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let checkpoint = Checkpoint::parse(&punto)?;
    let cookie = state.cookies.read(&headers);

    match state.checkin.scan_checkpoint(cookie, None, checkpoint).await {
        Ok(outcome) => Ok(scan_response(&state, outcome)),
        Err(TrackingError::PlateRequired) => {
            debug!(checkpoint = %checkpoint, "No active session for device, asking for plate");
            Ok(Json(serde_json::json!({
                "status": "plate_required",
                "punto": checkpoint.code(),
                "nombre": checkpoint.display_name(),
            }))
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /scan/:punto
pub async fn scan_post(
    State(state): State<AppState>,
    Path(punto): Path<String>,
    headers: HeaderMap,
    FormOrJson(form): FormOrJson<PlateForm>,
) -> ApiResult<Response> {
    let checkpoint = Checkpoint::parse(&punto)?;
    let cookie = state
        .cookies
        .read(&headers)
        .unwrap_or_else(new_device_cookie);

    let outcome = state
        .checkin
        .scan_checkpoint(Some(cookie), form.placa, checkpoint)
        .await?;
    Ok(scan_response(&state, outcome))
}

fn scan_response(state: &AppState, outcome: ScanOutcome) -> Response {
    state.metrics.record_scan();
    match outcome.cycle {
        CycleOutcome::Completed => state.metrics.record_cycle_completed(),
        CycleOutcome::Discarded => state.metrics.record_cycle_discarded(),
        CycleOutcome::Open => {}
    }

    let mut response = Json(&outcome).into_response();
    state.cookies.write(response.headers_mut(), &outcome.cookie);
    response
}
