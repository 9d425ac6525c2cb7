//! Route handlers.

pub mod cycles;
pub mod devices;
pub mod health;
pub mod report;
pub mod scan;

use crate::domain::{messages, ApiError};
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{async_trait, Form, Json};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Body carrying the plate typed by the driver.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlateForm {
    #[serde(default)]
    pub placa: Option<String>,
}

/// JSON body whose rejections are reported as `{"error": ...}` with 400.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Extracts `T` from a JSON body or, for any other content type, from an
/// urlencoded form.
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|_| ApiError::bad_request(messages::PLATE_REQUIRED))?;
            Ok(Self(value))
        }
    }
}
