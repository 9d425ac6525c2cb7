//! Device registration against the plate whitelist.

use super::PlateForm;
use crate::domain::ApiResult;
use crate::router::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use qrlogix_tracking::new_device_cookie;
use url::form_urlencoded;

/// POST /registro_dispositivo
pub async fn register_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PlateForm>,
) -> ApiResult<Response> {
    let existing = state.cookies.read(&headers);
    let device_id = existing.clone().unwrap_or_else(new_device_cookie);
    let placa = form.placa.unwrap_or_default();

    let plate = state.checkin.register_device(&device_id, &placa).await?;
    state.metrics.record_device_registered();

    let mut response = Redirect::to(&registration_ok_location(&plate)).into_response();
    if existing.is_none() {
        state.cookies.write(response.headers_mut(), &device_id);
    }
    Ok(response)
}

/// GET /registro_ok
pub async fn registration_ok(Query(form): Query<PlateForm>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "registered": true,
        "placa": form.placa.unwrap_or_default(),
    }))
}

fn registration_ok_location(plate: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("placa", plate)
        .finish();
    format!("/registro_ok?{query}")
}
