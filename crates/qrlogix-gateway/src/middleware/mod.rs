//! Middleware stack for the check-in gateway.
//!
//! Layer order: Request → Cors → Tracing → Metrics → Timeout → Handler

pub mod cors;
pub mod metrics;
pub mod tracing;

pub use self::cors::create_cors_layer;
pub use self::metrics::{GatewayMetrics, MetricsLayer, RequestTimer};
pub use self::tracing::TracingLayer;
