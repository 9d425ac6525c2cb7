//! Error conversions from tracking and infrastructure types.

use crate::domain::{messages, ApiError, ConfigError, GatewayError};
use qrlogix_tracking::TrackingError;
use tracing::error;

impl From<TrackingError> for ApiError {
    fn from(e: TrackingError) -> Self {
        if !e.is_client_error() {
            error!(error = %e, "Request failed");
            return ApiError::internal(messages::INTERNAL);
        }
        match e {
            TrackingError::UnknownCheckpoint(code) => ApiError::not_found(messages::UNKNOWN_CHECKPOINT)
                .with_data(serde_json::json!({ "punto": code })),
            TrackingError::PlateRequired => ApiError::bad_request(messages::PLATE_REQUIRED),
            TrackingError::InvalidPlate(_) => ApiError::forbidden(messages::PLATE_NOT_AUTHORIZED),
            TrackingError::SessionNotFound(_) => ApiError::not_found(messages::SESSION_NOT_FOUND),
            TrackingError::OpenCycleNotFound(_) => {
                ApiError::not_found(messages::OPEN_CYCLE_NOT_FOUND)
            }
            TrackingError::InvalidAction(_) => ApiError::bad_request(messages::INVALID_ACTION),
            TrackingError::InvalidDateRange => ApiError::bad_request(messages::INVALID_DATES),
            TrackingError::Storage(_) | TrackingError::Report(_) => {
                ApiError::internal(messages::INTERNAL)
            }
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        error!(error = %e, "I/O error");
        ApiError::internal(messages::INTERNAL)
    }
}

impl From<ConfigError> for GatewayError {
    fn from(e: ConfigError) -> Self {
        GatewayError::Config(e.to_string())
    }
}
