//! Health check, queue view and Prometheus metrics server
//!
//! This module provides the read-only HTTP surface of the teller-queue
//! service using Axum.

use crate::metrics::collector::MetricsCollector;
use crate::service::health::{HealthCheck, HealthStatus, ServiceMonitor};
use crate::types::{Customer, CustomerStatus};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Completed customers listed by the queue view
const RECENTLY_COMPLETED_LIMIT: usize = 10;

/// Health server configuration
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    /// Port to bind the health server to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Shared state for the health server
#[derive(Clone)]
pub struct HealthServerState {
    pub metrics_collector: Arc<MetricsCollector>,
    pub monitor: Option<ServiceMonitor>,
}

/// Health server that provides HTTP endpoints for monitoring
pub struct HealthServer {
    config: HealthServerConfig,
    state: HealthServerState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    /// Create a new health server
    pub fn new(config: HealthServerConfig, metrics_collector: Arc<MetricsCollector>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: HealthServerState {
                metrics_collector,
                monitor: None,
            },
            shutdown_tx,
        }
    }

    /// Attach the service handles the endpoints report on
    pub fn with_monitor(mut self, monitor: ServiceMonitor) -> Self {
        self.state.monitor = Some(monitor);
        self
    }

    /// Start the health server
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid health server address")?;

        let app = self.create_router();
        let listener = TcpListener::bind(addr).await?;

        info!("Health server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // Serve with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Health server shutdown signal received");
            })
            .await?;

        info!("Health server stopped");
        Ok(())
    }

    /// Create the Axum router with all endpoints
    fn create_router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .route("/stats", get(stats_handler))
            .route("/queue", get(queue_handler))
            .route("/tellers", get(tellers_handler))
            .with_state(self.state.clone())
    }

    /// Stop the health server
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping health server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to health server: {}", e);
        }

        Ok(())
    }
}

fn not_initialized() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "unhealthy",
            "service": "teller-queue",
            "version": env!("CARGO_PKG_VERSION"),
            "error": "Service not initialized"
        })),
    )
}

/// Root endpoint handler - shows service information
async fn root_handler() -> impl IntoResponse {
    let info = json!({
        "service": "teller-queue",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/health",
            "/ready",
            "/metrics",
            "/stats",
            "/queue",
            "/tellers"
        ]
    });

    Json(info)
}

/// Full health check endpoint handler
async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Health check requested");

    let Some(monitor) = &state.monitor else {
        return not_initialized();
    };

    match HealthCheck::check(monitor).await {
        Ok(health) => {
            let code = match health.status {
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            };
            (
                code,
                Json(json!({
                    "status": health.status,
                    "service": health.service,
                    "version": health.version,
                    "checks": health.checks
                })),
            )
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            not_initialized()
        }
    }
}

/// Readiness check endpoint handler
async fn ready_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match &state.monitor {
        Some(monitor) => match HealthCheck::readiness_check(monitor).await {
            Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
            Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
            Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
            Err(e) => {
                error!("Readiness check failed: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
            }
        },
        None => (StatusCode::SERVICE_UNAVAILABLE, "Service not initialized"),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<HealthServerState>) -> Response {
    debug!("Metrics endpoint requested");

    let registry = state.metrics_collector.registry();
    let metric_families = registry.gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_output) => {
            debug!("Serving {} metric families", metric_families.len());
            (
                StatusCode::OK,
                [("content-type", encoder.format_type().to_string())],
                metrics_output,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

/// Today's queue statistics with the per-service and per-teller breakdowns
async fn stats_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Stats endpoint requested");

    let Some(monitor) = &state.monitor else {
        return not_initialized();
    };

    let store = monitor.store.read().await;
    let stats = json!({
        "service": {
            "name": monitor.service_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "queue": store.stats(),
        "services": store.service_breakdown(),
        "tellers": store.teller_performance(),
        "last_refresh": store.last_refreshed(),
        "timestamp": chrono::Utc::now()
    });

    (StatusCode::OK, Json(stats))
}

fn queue_entry(customer: &Customer) -> serde_json::Value {
    json!({
        "id": customer.id,
        "name": customer.name,
        "token_number": customer.token_number,
        "service_type": customer.service_type,
        "status": customer.status,
        "check_in_time": customer.check_in_time,
        "estimated_wait_time": customer.estimated_wait_time,
        "teller_id": customer.teller_id
    })
}

/// Today's waiting and serving customers in token order
async fn queue_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Queue endpoint requested");

    let Some(monitor) = &state.monitor else {
        return not_initialized();
    };

    let store = monitor.store.read().await;
    let list = |status: CustomerStatus| -> Vec<serde_json::Value> {
        store
            .customers_by_status(status)
            .into_iter()
            .map(queue_entry)
            .collect()
    };

    let queue = json!({
        "waiting": list(CustomerStatus::Waiting),
        "serving": list(CustomerStatus::Serving),
        "recently_completed": store
            .recently_completed(RECENTLY_COMPLETED_LIMIT)
            .into_iter()
            .map(queue_entry)
            .collect::<Vec<_>>(),
        "next_token": store.next_token()
    });

    (StatusCode::OK, Json(queue))
}

/// The roster with current status and the next customer each would call
async fn tellers_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Tellers endpoint requested");

    let Some(monitor) = &state.monitor else {
        return not_initialized();
    };

    let store = monitor.store.read().await;
    let tellers: Vec<serde_json::Value> = store
        .tellers()
        .iter()
        .map(|teller| {
            json!({
                "id": teller.id,
                "name": teller.name,
                "status": teller.status,
                "service_types": teller.service_types,
                "customers_served": teller.customers_served,
                "current_customer_id": teller.current_customer_id,
                "next_token": store
                    .next_for_teller(&teller.id)
                    .map(|customer| customer.token_number)
            })
        })
        .collect();

    (StatusCode::OK, Json(json!({ "tellers": tellers })))
}
