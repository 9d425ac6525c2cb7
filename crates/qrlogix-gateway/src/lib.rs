#![allow(missing_docs)]

//! # QRLogix Gateway
//!
//! HTTP surface of the check-in system. Drivers scan a QR code at each
//! checkpoint, the phone opens `/scan/{punto}` and the gateway records the
//! scan against the truck behind the device cookie.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    QRLOGIX GATEWAY                    │
//! ├──────────────────────────────────────────────────────┤
//! │  Cors → Tracing → Metrics → Timeout                   │
//! │                    │                                  │
//! │   /scan  /registro_dispositivo  /ciclos  /tablero     │
//! │   /descargar_informe  /health  /metrics               │
//! │                    │                                  │
//! │            CheckinService (tracking)                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use qrlogix_gateway::{GatewayConfig, GatewayService};
//!
//! let config = GatewayConfig::from_env()?;
//! let gateway = GatewayService::new(config, checkin)?;
//! gateway.serve(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod cookies;
pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;

pub use cookies::DeviceCookies;
pub use domain::{
    messages, ApiError, ApiResult, AppConfig, ConfigError, CookieConfig, CorsConfig,
    GatewayConfig, GatewayError, HttpConfig, SecurityConfig, SessionConfig,
};
pub use middleware::GatewayMetrics;
pub use router::{build_router, AppState};
pub use service::GatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
