//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the teller-queue
//! service. Health is judged by whether the service is running and how
//! recently the store was resynchronized with the remote API.

use crate::store::QueueStore;
use crate::types::TellerStatus;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Refreshes that may be missed before the mirror counts as stale
const STALE_AFTER_INTERVALS: u32 = 3;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value (0=unhealthy, 1=degraded, 2=healthy)
    pub fn as_metric(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    /// Combine with another check, keeping the worse status
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        if self.as_metric() <= other.as_metric() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Everything a health check needs to look at
#[derive(Clone)]
pub struct ServiceMonitor {
    pub service_name: String,
    pub store: Arc<RwLock<QueueStore>>,
    pub is_running: Arc<RwLock<bool>>,
    pub refresh_interval: Duration,
}

impl ServiceMonitor {
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
}

/// Queue statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub total_customers: usize,
    pub waiting_customers: usize,
    pub avg_wait_time: i64,
    pub avg_service_time: i64,
    pub tellers_available: usize,
    pub tellers_serving: usize,
    pub tellers_on_break: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl ServiceStats {
    fn from_store(store: &QueueStore) -> Self {
        let stats = store.stats();
        let count = |status: TellerStatus| {
            store
                .tellers()
                .iter()
                .filter(|teller| teller.status == status)
                .count()
        };

        Self {
            total_customers: stats.total_customers,
            waiting_customers: stats.waiting_customers,
            avg_wait_time: stats.avg_wait_time,
            avg_service_time: stats.avg_service_time,
            tellers_available: count(TellerStatus::Available),
            tellers_serving: count(TellerStatus::Serving),
            tellers_on_break: count(TellerStatus::Break),
            last_refresh: store.last_refreshed(),
        }
    }
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(monitor: &ServiceMonitor) -> Result<Self> {
        let mut checks = Vec::new();

        checks.push(Self::check_service_running(monitor).await);

        let store = monitor.store.read().await;
        checks.push(Self::check_remote_sync(&store, monitor.refresh_interval));
        let stats = ServiceStats::from_store(&store);
        drop(store);

        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |overall, check| overall.worst(check.status));

        Ok(HealthCheck {
            status,
            service: monitor.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            checks,
            stats,
        })
    }

    /// Readiness check - running and mirroring the remote queue
    pub async fn readiness_check(monitor: &ServiceMonitor) -> Result<HealthStatus> {
        if !monitor.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        let store = monitor.store.read().await;
        Ok(Self::check_remote_sync(&store, monitor.refresh_interval).status)
    }

    async fn check_service_running(monitor: &ServiceMonitor) -> ComponentCheck {
        let (status, message) = if monitor.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
        }
    }

    fn check_remote_sync(store: &QueueStore, refresh_interval: Duration) -> ComponentCheck {
        let (status, message) = assess_sync(
            store.last_refreshed(),
            store.last_refresh_error(),
            store.clock().now(),
            refresh_interval,
        );
        debug!("Remote sync check: {:?}", status);

        ComponentCheck {
            name: "remote_sync".to_string(),
            status,
            message,
        }
    }
}

/// Judge the mirror from its last successful refresh and last error
///
/// Never refreshed is unhealthy. A stale mirror, or a recent success followed
/// by a failure, is degraded.
pub fn assess_sync(
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<&str>,
    now: DateTime<Utc>,
    refresh_interval: Duration,
) -> (HealthStatus, Option<String>) {
    let Some(last_refresh) = last_refresh else {
        let message = match last_error {
            Some(error) => format!("No successful refresh yet: {}", error),
            None => "No successful refresh yet".to_string(),
        };
        return (HealthStatus::Unhealthy, Some(message));
    };

    let stale_after = chrono::Duration::from_std(refresh_interval * STALE_AFTER_INTERVALS)
        .unwrap_or_else(|_| chrono::Duration::minutes(5));
    let age = now - last_refresh;

    if age > stale_after {
        return (
            HealthStatus::Degraded,
            Some(format!(
                "Last successful refresh {}s ago",
                age.num_seconds()
            )),
        );
    }

    match last_error {
        Some(error) => (
            HealthStatus::Degraded,
            Some(format!("Last refresh failed: {}", error)),
        ),
        None => (HealthStatus::Healthy, None),
    }
}
