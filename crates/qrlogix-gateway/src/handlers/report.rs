//! Cycle report download.

use crate::domain::{messages, ApiError, ApiResult};
use crate::router::AppState;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use qrlogix_tracking::XLSX_CONTENT_TYPE;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "fechaInicio", default)]
    pub fecha_inicio: Option<String>,
    #[serde(rename = "fechaFin", default)]
    pub fecha_fin: Option<String>,
}

/// GET /descargar_informe?fechaInicio=YYYY-MM-DD&fechaFin=YYYY-MM-DD
pub async fn download_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let from = parse_date(query.fecha_inicio.as_deref())?;
    let to = parse_date(query.fecha_fin.as_deref())?;

    let report = state.checkin.cycle_report(from, to).await?;
    let bytes = report.to_xlsx()?;
    state.metrics.record_report();
    info!(from = %from, to = %to, rows = report.rows.len(), "Report generated");

    let disposition = format!("attachment; filename={}", report.filename());
    Ok((
        [
            (CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

fn parse_date(raw: Option<&str>) -> ApiResult<NaiveDate> {
    raw.map(str::trim)
        .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
        .ok_or_else(|| ApiError::bad_request(messages::INVALID_DATES))
}
