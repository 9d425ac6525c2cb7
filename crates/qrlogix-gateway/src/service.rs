//! Gateway service - binds the listener and serves the router.

use crate::domain::{GatewayConfig, GatewayError};
use crate::middleware::GatewayMetrics;
use crate::router::{build_router, AppState};
use axum::Router;
use qrlogix_tracking::CheckinService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const LOCK_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// HTTP gateway in front of the check-in service
pub struct GatewayService {
    config: GatewayConfig,
    checkin: Arc<CheckinService>,
    metrics: Arc<GatewayMetrics>,
}

impl GatewayService {
    /// Create a new gateway service
    pub fn new(config: GatewayConfig, checkin: Arc<CheckinService>) -> Result<Self, GatewayError> {
        config.validate()?;

        Ok(Self {
            config,
            checkin,
            metrics: Arc::new(GatewayMetrics::new()),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Router with the middleware stack, sharing this service's metrics.
    pub fn router(&self) -> Router {
        let state = AppState::new(
            &self.config,
            Arc::clone(&self.checkin),
            Arc::clone(&self.metrics),
        );
        build_router(&self.config, state)
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve<F>(&self, signal: F) -> Result<(), GatewayError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;

        info!(addr = %addr, service = %self.config.app.name, "Starting HTTP server");

        let cleanup = self.start_cleanup_task();
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await;
        cleanup.abort();

        if let Err(e) = result {
            error!(error = %e, "HTTP server error");
            return Err(GatewayError::Serve(e.to_string()));
        }

        info!("HTTP server stopped");
        Ok(())
    }

    /// Periodically drop idle per-plate locks.
    fn start_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        let checkin = Arc::clone(&self.checkin);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOCK_PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                let pruned = checkin.prune_locks();
                if pruned > 0 {
                    debug!(pruned, "Pruned idle scan locks");
                }
            }
        })
    }
}
