//! Main application state and service coordination
//!
//! This module contains the AppState that owns the shared queue store,
//! the metrics service and the background tasks, and routes user actions
//! through the store's optimistic mutations.

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::gateway::QueueGateway;
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::service::health::ServiceMonitor;
use crate::service::refresher;
use crate::store::{MutationKind, MutationOutcome, Prepared, QueueStore};
use crate::types::{Customer, CustomerStatus, TellerStatus};
use crate::validation::RegistrationRequest;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Shared queue store
    store: Arc<RwLock<QueueStore>>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application over a gateway and clock
    pub fn new(
        config: AppConfig,
        gateway: Arc<dyn QueueGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing teller-queue service");
        info!(
            "Configuration: service={}, roster={} tellers",
            config.service.name,
            config.roster.len()
        );

        let store = QueueStore::from_config(&config, gateway, clock).map_err(|e| {
            ServiceError::Configuration {
                message: format!("Failed to create queue store: {}", e),
            }
        })?;
        let store = Arc::new(RwLock::new(store));
        let is_running = Arc::new(RwLock::new(false));

        let metrics_service = Self::initialize_metrics(&config, &store, &is_running)?;

        Ok(Self {
            config,
            store,
            metrics_service,
            background_tasks: Vec::new(),
            is_running,
            started_at: Instant::now(),
        })
    }

    /// Start the refresh loop and the HTTP endpoints
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting teller-queue service");

        // Mark as running
        *self.is_running.write().await = true;

        // Start metrics service first
        self.start_metrics_service().await?;

        // Start background tasks
        self.start_background_tasks();

        info!("✅ Teller-queue service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of teller-queue service");

        // Mark as not running
        *self.is_running.write().await = false;

        // Stop metrics service
        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("✅ Metrics service stopped");
        }

        // Stop background tasks
        self.stop_background_tasks().await;

        let final_stats = self.store.read().await.stats();
        info!("Final queue statistics: {:?}", final_stats);
        info!("✅ Teller-queue service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the shared queue store
    pub fn store(&self) -> Arc<RwLock<QueueStore>> {
        self.store.clone()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Handles for health checks
    pub fn monitor(&self) -> ServiceMonitor {
        Self::build_monitor(&self.config, &self.store, &self.is_running)
    }

    /// Resynchronize the store now
    pub async fn refresh(&self) -> Result<()> {
        refresher::refresh_once(&self.store, &self.metrics_service.collector()).await
    }

    /// Register a new customer
    pub async fn register(&self, request: RegistrationRequest) -> Result<Customer> {
        let (registration, gateway) = {
            let store = self.store.read().await;
            (store.begin_registration(request)?, store.gateway())
        };

        let created = gateway
            .create_customer(registration.customer.clone())
            .await?;
        let service_type = created.service_type;

        let customer = {
            let mut store = self.store.write().await;
            let customer = store.finish_registration(registration, created);
            self.metrics_service
                .collector()
                .update_from_stats(&store.stats());
            customer
        };

        self.metrics_service
            .collector()
            .record_registration(service_type);
        Ok(customer)
    }

    /// Call the next qualified customer to a teller
    pub async fn call_next(&self, teller_id: &str) -> Result<MutationOutcome> {
        self.run_mutation(MutationKind::Assign, |store| store.begin_assign(teller_id))
            .await
    }

    /// Complete the teller's current customer
    pub async fn complete_service(&self, teller_id: &str) -> Result<MutationOutcome> {
        self.run_mutation(MutationKind::Complete, |store| {
            store.begin_complete(teller_id)
        })
        .await
    }

    /// Move a customer to another status
    pub async fn update_customer_status(
        &self,
        customer_id: &str,
        status: CustomerStatus,
    ) -> Result<MutationOutcome> {
        self.run_mutation(MutationKind::StatusUpdate, |store| {
            store.begin_status_update(customer_id, status)
        })
        .await
    }

    /// Change a teller's availability
    pub async fn set_teller_status(
        &self,
        teller_id: &str,
        status: TellerStatus,
    ) -> Result<MutationOutcome> {
        let mut store = self.store.write().await;
        let outcome = store.set_teller_status(teller_id, status)?;

        let collector = self.metrics_service.collector();
        collector.record_mutation(MutationKind::TellerStatus, &outcome);
        collector.update_tellers(store.tellers());
        Ok(outcome)
    }

    /// Apply locally under the write lock, call the remote without it, settle
    async fn run_mutation<F>(&self, kind: MutationKind, begin: F) -> Result<MutationOutcome>
    where
        F: FnOnce(&mut QueueStore) -> Result<Prepared>,
    {
        let (prepared, gateway) = {
            let mut store = self.store.write().await;
            (begin(&mut *store)?, store.gateway())
        };

        let outcome = match prepared {
            Prepared::Skipped(reason) => MutationOutcome::Skipped(reason),
            Prepared::Pending(pending) => {
                let result = pending.send(gateway.as_ref()).await;
                let mut store = self.store.write().await;
                let outcome = store.settle(pending, result);

                let collector = self.metrics_service.collector();
                collector.update_from_stats(&store.stats());
                collector.update_tellers(store.tellers());
                outcome
            }
        };

        debug!("{} finished: {}", kind, outcome);
        self.metrics_service
            .collector()
            .record_mutation(kind, &outcome);
        Ok(outcome)
    }

    fn build_monitor(
        config: &AppConfig,
        store: &Arc<RwLock<QueueStore>>,
        is_running: &Arc<RwLock<bool>>,
    ) -> ServiceMonitor {
        ServiceMonitor {
            service_name: config.service.name.clone(),
            store: store.clone(),
            is_running: is_running.clone(),
            refresh_interval: config.refresh_interval(),
        }
    }

    /// Initialize metrics service
    fn initialize_metrics(
        config: &AppConfig,
        store: &Arc<RwLock<QueueStore>>,
        is_running: &Arc<RwLock<bool>>,
    ) -> Result<Arc<MetricsService>, ServiceError> {
        info!(
            "Initializing metrics service on port {}",
            config.service.http_port
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let health_config = HealthServerConfig {
            port: config.service.http_port,
            host: "0.0.0.0".to_string(),
        };

        let health_server = Arc::new(
            HealthServer::new(health_config, metrics_collector.clone())
                .with_monitor(Self::build_monitor(config, store, is_running)),
        );
        let metrics_service = Arc::new(MetricsService::new(metrics_collector, health_server));

        Ok(metrics_service)
    }

    /// Start metrics service
    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        info!("Starting metrics and health endpoints");

        // Clone necessary references for the background task
        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.http_port;

        // Spawn the metrics service as a background task
        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        // Add the handle to background tasks for proper shutdown
        self.background_tasks.push(metrics_handle);

        // Give the server a moment to start up
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Start background tasks
    fn start_background_tasks(&mut self) {
        info!("Starting background tasks...");

        let refresh_task = refresher::spawn_refresh_loop(
            self.store.clone(),
            self.metrics_service.collector(),
            self.config.refresh_interval(),
            self.is_running.clone(),
        );

        // Service health metrics task
        let health_metrics_task = {
            let metrics_collector = self.metrics_service.collector();
            let monitor = self.monitor();
            let is_running = self.is_running.clone();
            let started_at = self.started_at;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                info!("Health metrics task started");

                while *is_running.read().await {
                    interval.tick().await;

                    metrics_collector.update_uptime(started_at.elapsed());
                    match crate::service::HealthCheck::check(&monitor).await {
                        Ok(health) => {
                            metrics_collector.update_health_status(health.status.as_metric());
                            debug!("Updated service health metrics - status: {}", health.status);
                        }
                        Err(e) => warn!("Health check failed: {}", e),
                    }
                }

                info!("Health metrics task stopped");
            })
        };

        self.background_tasks.push(refresh_task);
        self.background_tasks.push(health_metrics_task);

        info!("2 background tasks started successfully");
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
