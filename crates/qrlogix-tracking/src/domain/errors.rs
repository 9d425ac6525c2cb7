//! Error types for check-in tracking.

use thiserror::Error;

/// Result alias for tracking operations.
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Errors raised by the check-in service and its storage adapters.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown checkpoint: {0}")]
    UnknownCheckpoint(String),

    /// A new session needs a plate and none was supplied.
    #[error("A license plate is required to open a session")]
    PlateRequired,

    /// Plate is empty or not on the authorized list.
    #[error("Plate not authorized: {0}")]
    InvalidPlate(String),

    #[error("No session found for plate {0}")]
    SessionNotFound(String),

    #[error("No open cycle for plate {0}")]
    OpenCycleNotFound(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Report rendering failed.
    #[error("Report error: {0}")]
    Report(String),

    #[error("Report end date is before its start date")]
    InvalidDateRange,
}

impl TrackingError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for errors caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Report(_))
    }
}
