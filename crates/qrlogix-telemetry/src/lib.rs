//! # QRLogix Telemetry
//!
//! Structured logging for the QRLogix services, built on `tracing`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qrlogix_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QRLOGIX_LOG_LEVEL` | `RUST_LOG`, then `info` | Log filter directives |
//! | `QRLOGIX_JSON_LOGS` | `true` in containers | JSON output |
//! | `QRLOGIX_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `QRLOGIX_SERVICE_NAME` | `qrlogix` | Service name in startup logs |

mod config;
mod logging;

pub use config::{parse_flag, TelemetryConfig};
pub use logging::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(String),
}
