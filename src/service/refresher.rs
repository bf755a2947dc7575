//! Timer-driven resynchronization with the remote API

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::store::QueueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Refresh the shared store once
///
/// The remote is queried without holding the store lock; only installing the
/// result takes the write lock. A list fetched while a local mutation went
/// through is dropped rather than applied over it.
pub async fn refresh_once(
    store: &RwLock<QueueStore>,
    metrics: &MetricsCollector,
) -> Result<()> {
    let (gateway, started_at) = {
        let store = store.read().await;
        (store.gateway(), store.generation())
    };

    let timer = metrics.start_timer();
    let fetched = gateway.list_customers().await;
    let duration = timer.stop();

    let mut store = store.write().await;
    let result = store.apply_refresh_from(fetched, started_at);
    metrics.record_refresh(result.is_ok(), duration);
    metrics.update_from_stats(&store.stats());
    metrics.update_tellers(store.tellers());

    match result {
        Ok(true) => {
            debug!(
                "Refresh completed in {:.1}ms",
                duration.as_secs_f64() * 1000.0
            );
            Ok(())
        }
        Ok(false) => {
            debug!("Refresh overtaken by a local change, waiting for the next one");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Spawn the periodic refresh task
///
/// The first tick fires immediately. Failures are logged and the previous
/// state is kept; the loop ends once `is_running` is cleared.
pub fn spawn_refresh_loop(
    store: Arc<RwLock<QueueStore>>,
    metrics: Arc<MetricsCollector>,
    refresh_interval: Duration,
    is_running: Arc<RwLock<bool>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_interval);
        info!(
            "Refresh task started ({}s interval)",
            refresh_interval.as_secs()
        );

        while *is_running.read().await {
            interval.tick().await;

            if let Err(e) = refresh_once(&store, &metrics).await {
                warn!("Queue refresh failed, keeping previous state: {}", e);
            }
        }

        info!("Refresh task stopped");
    })
}
