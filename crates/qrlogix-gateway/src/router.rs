//! Route table and middleware wiring.

use crate::cookies::DeviceCookies;
use crate::domain::GatewayConfig;
use crate::handlers::{cycles, devices, health, report, scan};
use crate::middleware::{create_cors_layer, GatewayMetrics, MetricsLayer, TracingLayer};
use axum::routing::{get, post};
use axum::Router;
use qrlogix_tracking::CheckinService;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub checkin: Arc<CheckinService>,
    pub metrics: Arc<GatewayMetrics>,
    pub cookies: DeviceCookies,
    pub app_name: Arc<str>,
}

impl AppState {
    pub fn new(
        config: &GatewayConfig,
        checkin: Arc<CheckinService>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            checkin,
            metrics,
            cookies: DeviceCookies::new(config.cookie.clone()),
            app_name: Arc::from(config.app.name.as_str()),
        }
    }
}

/// Build the HTTP router with the middleware stack applied.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(&config.cors))
        .layer(TracingLayer::new())
        .layer(MetricsLayer::new(Arc::clone(&state.metrics)))
        .layer(TimeoutLayer::new(config.http.request_timeout()));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/scan/:punto", get(scan::scan_get).post(scan::scan_post))
        .route("/registro_dispositivo", post(devices::register_device))
        .route("/registro_ok", get(devices::registration_ok))
        .route("/ciclos", get(cycles::open_cycles))
        .route("/ciclos/accion", post(cycles::manual_action))
        .route("/tablero", get(cycles::dashboard))
        .route("/descargar_informe", get(report::download_report))
        .with_state(state)
        .layer(middleware)
}
