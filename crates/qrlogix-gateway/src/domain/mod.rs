//! Domain types for the gateway.
//!
//! Configuration and error handling.

pub mod config;
pub mod error;

// Re-exports for convenience
pub use config::{
    AppConfig, ConfigError, CookieConfig, CorsConfig, GatewayConfig, HttpConfig, SecurityConfig,
    SessionConfig,
};
pub use error::{messages, ApiError, ApiResult, GatewayError};
