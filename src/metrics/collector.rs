//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the teller-queue service
//! using Prometheus metrics.

use crate::store::{MutationKind, MutationOutcome};
use crate::types::{QueueStats, ServiceType, Teller, TellerStatus};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the queue service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue state metrics
    queue_metrics: QueueMetrics,

    /// Teller metrics
    teller_metrics: TellerMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Refresh attempts by status
    pub refreshes_total: IntCounterVec,

    /// Failed refreshes
    pub refresh_failures_total: IntCounter,

    /// Time taken by a remote refresh
    pub refresh_duration: Histogram,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Queue state metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Customers checked in today
    pub customers_total: IntGauge,

    /// Customers currently waiting
    pub customers_waiting: IntGauge,

    /// Average check-in to service start, minutes
    pub avg_wait_minutes: IntGauge,

    /// Average service start to end, minutes
    pub avg_service_minutes: IntGauge,

    /// Registrations by service type
    pub registrations_total: IntCounterVec,

    /// Store mutations by kind and outcome
    pub mutations_total: IntCounterVec,
}

/// Teller metrics
#[derive(Clone)]
pub struct TellerMetrics {
    /// Tellers by status
    pub tellers: IntGaugeVec,

    /// Customers served today, per teller
    pub customers_served: IntGaugeVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let teller_metrics = TellerMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            teller_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get teller metrics
    pub fn teller(&self) -> &TellerMetrics {
        &self.teller_metrics
    }

    /// Update gauges from the latest queue statistics
    pub fn update_from_stats(&self, stats: &QueueStats) {
        self.queue_metrics
            .customers_total
            .set(stats.total_customers as i64);
        self.queue_metrics
            .customers_waiting
            .set(stats.waiting_customers as i64);
        self.queue_metrics.avg_wait_minutes.set(stats.avg_wait_time);
        self.queue_metrics
            .avg_service_minutes
            .set(stats.avg_service_time);
    }

    /// Update teller gauges from the roster
    pub fn update_tellers(&self, tellers: &[Teller]) {
        for status in [
            TellerStatus::Available,
            TellerStatus::Serving,
            TellerStatus::Break,
        ] {
            let count = tellers.iter().filter(|t| t.status == status).count();
            self.teller_metrics
                .tellers
                .with_label_values(&[&status.to_string()])
                .set(count as i64);
        }

        for teller in tellers {
            self.teller_metrics
                .customers_served
                .with_label_values(&[&teller.id])
                .set(i64::from(teller.customers_served));
        }
    }

    /// Record a refresh attempt
    pub fn record_refresh(&self, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };
        self.service_metrics
            .refreshes_total
            .with_label_values(&[status])
            .inc();

        if !success {
            self.service_metrics.refresh_failures_total.inc();
        }

        self.service_metrics
            .refresh_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a successful registration
    pub fn record_registration(&self, service_type: ServiceType) {
        self.queue_metrics
            .registrations_total
            .with_label_values(&[service_type.as_str()])
            .inc();
    }

    /// Record the outcome of a store mutation
    pub fn record_mutation(&self, kind: MutationKind, outcome: &MutationOutcome) {
        self.queue_metrics
            .mutations_total
            .with_label_values(&[kind.as_str(), outcome.label()])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update service uptime
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("teller_queue_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let refreshes_total = IntCounterVec::new(
            Opts::new(
                "teller_queue_refreshes_total",
                "Queue refreshes from the remote API",
            ),
            &["status"],
        )?;
        registry.register(Box::new(refreshes_total.clone()))?;

        let refresh_failures_total = IntCounter::new(
            "teller_queue_refresh_failures_total",
            "Failed queue refreshes",
        )?;
        registry.register(Box::new(refresh_failures_total.clone()))?;

        let refresh_duration = Histogram::with_opts(
            HistogramOpts::new(
                "teller_queue_refresh_duration_seconds",
                "Remote refresh duration",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(refresh_duration.clone()))?;

        let health_status = IntGauge::new(
            "teller_queue_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            refreshes_total,
            refresh_failures_total,
            refresh_duration,
            health_status,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let customers_total = IntGauge::new(
            "teller_queue_customers_total",
            "Customers checked in today",
        )?;
        registry.register(Box::new(customers_total.clone()))?;

        let customers_waiting = IntGauge::new(
            "teller_queue_customers_waiting",
            "Customers currently waiting",
        )?;
        registry.register(Box::new(customers_waiting.clone()))?;

        let avg_wait_minutes = IntGauge::new(
            "teller_queue_avg_wait_minutes",
            "Average wait before service today, in minutes",
        )?;
        registry.register(Box::new(avg_wait_minutes.clone()))?;

        let avg_service_minutes = IntGauge::new(
            "teller_queue_avg_service_minutes",
            "Average service time today, in minutes",
        )?;
        registry.register(Box::new(avg_service_minutes.clone()))?;

        let registrations_total = IntCounterVec::new(
            Opts::new(
                "teller_queue_registrations_total",
                "Customers registered by this instance",
            ),
            &["service_type"],
        )?;
        registry.register(Box::new(registrations_total.clone()))?;

        let mutations_total = IntCounterVec::new(
            Opts::new("teller_queue_mutations_total", "Store mutations by outcome"),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(mutations_total.clone()))?;

        Ok(Self {
            customers_total,
            customers_waiting,
            avg_wait_minutes,
            avg_service_minutes,
            registrations_total,
            mutations_total,
        })
    }
}

impl TellerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let tellers = IntGaugeVec::new(
            Opts::new("teller_queue_tellers", "Tellers by status"),
            &["status"],
        )?;
        registry.register(Box::new(tellers.clone()))?;

        let customers_served = IntGaugeVec::new(
            Opts::new(
                "teller_queue_customers_served",
                "Customers served today by teller",
            ),
            &["teller_id"],
        )?;
        registry.register(Box::new(customers_served.clone()))?;

        Ok(Self {
            tellers,
            customers_served,
        })
    }
}
