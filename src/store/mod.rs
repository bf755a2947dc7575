//! Queue state store
//!
//! `QueueStore` owns one client's copy of the queue: today's customers as last
//! seen on the remote API, the teller roster and the derived statistics. State
//! only changes through [`QueueStore::refresh`] (or its split form
//! [`QueueStore::apply_refresh`]), registration and the optimistic mutations
//! in [`mutations`].

pub mod mutations;
pub mod outcome;

pub use outcome::{MutationKind, MutationOutcome, PendingMutation, Prepared, SkipReason};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::error::Result;
use crate::gateway::QueueGateway;
use crate::queue::{self, ServiceBreakdown, TellerPerformance, WaitTimeEstimator};
use crate::types::{
    Customer, CustomerStatus, NewCustomer, QueueStats, ServiceType, Teller, TellerStatus,
};
use crate::validation::RegistrationRequest;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

/// A validated registration awaiting its remote record
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub customer: NewCustomer,
    pub predicted_token: u32,
    /// Minutes, computed at check-in and never recomputed
    pub estimated_wait_time: u32,
}

/// Owned queue state for one client
pub struct QueueStore {
    gateway: Arc<dyn QueueGateway>,
    clock: Arc<dyn Clock>,
    estimator: WaitTimeEstimator,
    customers: Vec<Customer>,
    tellers: Vec<Teller>,
    stats: QueueStats,
    last_refresh: Option<DateTime<Utc>>,
    last_refresh_error: Option<String>,
    /// Bumped on every local change; a fetch started earlier is stale
    generation: u64,
}

impl QueueStore {
    /// Create an empty store over a fixed roster
    pub fn new(
        gateway: Arc<dyn QueueGateway>,
        clock: Arc<dyn Clock>,
        tellers: Vec<Teller>,
        estimator: WaitTimeEstimator,
    ) -> Self {
        Self {
            gateway,
            clock,
            estimator,
            customers: Vec::new(),
            tellers,
            stats: QueueStats::default(),
            last_refresh: None,
            last_refresh_error: None,
            generation: 0,
        }
    }

    /// Create a store with the configured roster and wait-time table
    pub fn from_config(
        config: &AppConfig,
        gateway: Arc<dyn QueueGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let estimator = WaitTimeEstimator::new(config.queue.wait_time.clone())?;
        let tellers = config
            .roster
            .iter()
            .map(|teller| teller.to_teller())
            .collect();
        Ok(Self::new(gateway, clock, tellers, estimator))
    }

    /// Resynchronize from the remote API
    ///
    /// On failure the previous state is kept and the error returned.
    pub async fn refresh(&mut self) -> Result<()> {
        let fetched = self.gateway.list_customers().await;
        self.apply_refresh(fetched)
    }

    /// Install the result of a `list_customers` call fetched elsewhere
    pub fn apply_refresh(&mut self, fetched: Result<Vec<Customer>>) -> Result<()> {
        let customers = match fetched {
            Ok(customers) => customers,
            Err(e) => {
                error!("Failed to refresh customers: {}", e);
                self.last_refresh_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.customers = customers;
        self.reconcile_tellers();
        self.recompute_stats();
        self.last_refresh = Some(self.clock.now());
        self.last_refresh_error = None;

        debug!(
            "Refreshed {} customers ({} today, {} waiting)",
            self.customers.len(),
            self.stats.total_customers,
            self.stats.waiting_customers
        );
        Ok(())
    }

    /// Install a fetch unless a local change happened since it started
    ///
    /// `started_at` is the [`QueueStore::generation`] read before the fetch
    /// was issued. A stale list could predate a remote write that has already
    /// settled, so it is dropped and `Ok(false)` returned; the next refresh
    /// picks the change up. Errors are always recorded.
    pub fn apply_refresh_from(
        &mut self,
        fetched: Result<Vec<Customer>>,
        started_at: u64,
    ) -> Result<bool> {
        if fetched.is_ok() && started_at != self.generation {
            debug!(
                "Discarding refresh started at generation {} (now {})",
                started_at, self.generation
            );
            return Ok(false);
        }
        self.apply_refresh(fetched).map(|()| true)
    }

    /// Counter of local changes, read before an unlocked fetch
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Derive teller status and counters from the customer list
    ///
    /// A teller referenced by a serving customer is serving; otherwise a
    /// break is kept and everyone else is available.
    fn reconcile_tellers(&mut self) {
        let clock = self.clock.as_ref();
        for teller in &mut self.tellers {
            let serving = self.customers.iter().find(|customer| {
                customer.status == CustomerStatus::Serving
                    && customer.teller_id.as_deref() == Some(teller.id.as_str())
            });

            match serving {
                Some(customer) => {
                    teller.status = TellerStatus::Serving;
                    teller.current_customer_id = Some(customer.id.clone());
                }
                None => {
                    if teller.status != TellerStatus::Break {
                        teller.status = TellerStatus::Available;
                    }
                    teller.current_customer_id = None;
                }
            }

            teller.customers_served = self
                .customers
                .iter()
                .filter(|customer| {
                    customer.status == CustomerStatus::Completed
                        && customer.teller_id.as_deref() == Some(teller.id.as_str())
                        && customer.checked_in_today(clock)
                })
                .count() as u32;
        }
    }

    pub(crate) fn recompute_stats(&mut self) {
        self.stats = queue::compute_stats(&self.customers, self.clock.as_ref());
    }

    /// Validate a registration and capture the local predictions
    pub fn begin_registration(&self, request: RegistrationRequest) -> Result<Registration> {
        let customer = request.validate()?;
        Ok(Registration {
            predicted_token: self.next_token(),
            estimated_wait_time: self.estimate_wait(customer.service_type),
            customer,
        })
    }

    /// Record the customer the remote created for a registration
    pub fn finish_registration(
        &mut self,
        registration: Registration,
        mut created: Customer,
    ) -> Customer {
        if created.token_number != registration.predicted_token {
            debug!(
                "Remote issued token {} (expected {}), another client registered concurrently",
                created.token_number, registration.predicted_token
            );
        }
        created.estimated_wait_time = registration.estimated_wait_time;
        self.bump_generation();

        match self
            .customers
            .iter_mut()
            .find(|customer| customer.id == created.id)
        {
            Some(existing) => *existing = created.clone(),
            None => self.customers.push(created.clone()),
        }
        self.recompute_stats();

        info!(
            "Registered {} for {} with token {} (~{} min)",
            created.name, created.service_type, created.token_number, created.estimated_wait_time
        );
        created
    }

    /// Register a new customer
    ///
    /// Input is validated before the remote is contacted. The returned record
    /// carries the wait estimate computed here at check-in.
    pub async fn register(&mut self, request: RegistrationRequest) -> Result<Customer> {
        let registration = self.begin_registration(request)?;
        let created = self
            .gateway
            .create_customer(registration.customer.clone())
            .await?;
        Ok(self.finish_registration(registration, created))
    }

    pub fn gateway(&self) -> Arc<dyn QueueGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn estimator(&self) -> &WaitTimeEstimator {
        &self.estimator
    }

    /// Every customer from the last refresh, including earlier days
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn tellers(&self) -> &[Teller] {
        &self.tellers
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    pub fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers
            .iter()
            .find(|customer| customer.id == customer_id)
    }

    pub fn teller(&self, teller_id: &str) -> Option<&Teller> {
        self.tellers.iter().find(|teller| teller.id == teller_id)
    }

    pub fn customers_by_status(&self, status: CustomerStatus) -> Vec<&Customer> {
        queue::customers_by_status(&self.customers, status, self.clock.as_ref())
    }

    /// The customer a teller would call next, if the teller exists
    pub fn next_for_teller(&self, teller_id: &str) -> Option<&Customer> {
        let teller = self.teller(teller_id)?;
        queue::next_for_teller(&self.customers, teller, self.clock.as_ref())
    }

    pub fn estimate_wait(&self, service_type: ServiceType) -> u32 {
        self.estimator.estimate(
            &self.customers,
            service_type,
            &self.tellers,
            self.clock.as_ref(),
        )
    }

    /// Token the next registration is expected to receive
    pub fn next_token(&self) -> u32 {
        queue::next_token_number(&self.customers, self.clock.as_ref())
    }

    pub fn service_breakdown(&self) -> Vec<ServiceBreakdown> {
        queue::service_breakdown(&self.customers, self.clock.as_ref())
    }

    pub fn teller_performance(&self) -> Vec<TellerPerformance> {
        queue::teller_performance(&self.customers, &self.tellers, self.clock.as_ref())
    }

    pub fn recently_completed(&self, limit: usize) -> Vec<&Customer> {
        queue::recently_completed(&self.customers, self.clock.as_ref(), limit)
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    pub fn last_refresh_error(&self) -> Option<&str> {
        self.last_refresh_error.as_deref()
    }

    pub(crate) fn customer_index(&self, customer_id: &str) -> Option<usize> {
        self.customers
            .iter()
            .position(|customer| customer.id == customer_id)
    }

    pub(crate) fn teller_index(&self, teller_id: &str) -> Option<usize> {
        self.tellers.iter().position(|teller| teller.id == teller_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::default_roster;
    use crate::gateway::{InMemoryGateway, MockQueueGateway};
    use crate::queue::testing::{customer_at, noon, served};
    use crate::QueueError;
    use chrono::Duration;

    pub(crate) fn roster() -> Vec<Teller> {
        default_roster().iter().map(|t| t.to_teller()).collect()
    }

    pub(crate) fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::at(noon()))
    }

    pub(crate) fn store_with(customers: Vec<Customer>) -> (QueueStore, Arc<InMemoryGateway>) {
        let clock = clock();
        let gateway = Arc::new(InMemoryGateway::with_customers(clock.clone(), customers));
        let store = QueueStore::new(
            gateway.clone(),
            clock,
            roster(),
            WaitTimeEstimator::default(),
        );
        (store, gateway)
    }

    #[tokio::test]
    async fn test_refresh_reconciles_tellers() {
        let (mut store, _) = store_with(vec![
            served(2, ServiceType::Forex, 5, None, "1"),
            served(3, ServiceType::DomesticTransfer, 4, Some(6), "3"),
            served(4, ServiceType::AccountServices, 4, Some(9), "3"),
            customer_at(1, ServiceType::Forex, CustomerStatus::Waiting, noon()),
        ]);
        store.tellers[1].status = TellerStatus::Break;
        store.tellers[2].status = TellerStatus::Serving;

        store.refresh().await.unwrap();

        let jean = store.teller("1").unwrap();
        assert_eq!(jean.status, TellerStatus::Serving);
        assert_eq!(jean.current_customer_id.as_deref(), Some("customer-2"));

        assert_eq!(store.teller("2").unwrap().status, TellerStatus::Break);

        let emmanuel = store.teller("3").unwrap();
        assert_eq!(emmanuel.status, TellerStatus::Available);
        assert_eq!(emmanuel.current_customer_id, None);
        assert_eq!(emmanuel.customers_served, 2);

        assert_eq!(store.stats().total_customers, 4);
        assert_eq!(store.stats().waiting_customers, 1);
        assert_eq!(store.last_refreshed(), Some(noon()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_state() {
        let (mut store, gateway) = store_with(vec![customer_at(
            1,
            ServiceType::Forex,
            CustomerStatus::Waiting,
            noon(),
        )]);
        store.refresh().await.unwrap();

        gateway.set_unavailable(true);
        assert!(store.refresh().await.is_err());

        assert_eq!(store.customers().len(), 1);
        assert_eq!(store.stats().waiting_customers, 1);
        assert!(store.last_refresh_error().is_some());

        gateway.set_unavailable(false);
        store.refresh().await.unwrap();
        assert!(store.last_refresh_error().is_none());
    }

    #[tokio::test]
    async fn test_register_uses_local_estimate() {
        let waiting: Vec<Customer> = (1..=4)
            .map(|token| {
                customer_at(
                    token,
                    ServiceType::AccountServices,
                    CustomerStatus::Waiting,
                    noon() - Duration::minutes(30),
                )
            })
            .collect();
        let (mut store, _) = store_with(waiting);
        store.refresh().await.unwrap();

        let created = store
            .register(RegistrationRequest::new(
                "Aline",
                "0712345678",
                ServiceType::AccountServices,
            ))
            .await
            .unwrap();

        // Four ahead, 10 minutes each, one qualified teller
        assert_eq!(created.estimated_wait_time, 40);
        assert_eq!(created.token_number, 5);
        assert_eq!(store.customers().len(), 5);
        assert_eq!(store.stats().waiting_customers, 5);
        assert_eq!(store.next_token(), 6);
    }

    #[tokio::test]
    async fn test_invalid_registration_never_reaches_gateway() {
        let mut gateway = MockQueueGateway::new();
        gateway.expect_create_customer().never();

        let mut store = QueueStore::new(
            Arc::new(gateway),
            clock(),
            roster(),
            WaitTimeEstimator::default(),
        );

        let err = store
            .register(RegistrationRequest::new("Aline", "12345", ServiceType::Forex))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::InvalidInput { .. })
        ));
        assert!(store.customers().is_empty());
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_state_untouched() {
        let mut gateway = MockQueueGateway::new();
        gateway.expect_create_customer().times(1).returning(|_| {
            Err(QueueError::Transport {
                message: "connection refused".to_string(),
            }
            .into())
        });

        let mut store = QueueStore::new(
            Arc::new(gateway),
            clock(),
            roster(),
            WaitTimeEstimator::default(),
        );

        assert!(store
            .register(RegistrationRequest::new("Aline", "0712345678", ServiceType::Forex))
            .await
            .is_err());
        assert!(store.customers().is_empty());
        assert_eq!(store.stats(), QueueStats::default());
    }

    #[tokio::test]
    async fn test_views_ignore_other_days() {
        let yesterday = noon() - Duration::days(1);
        let (mut store, _) = store_with(Vec::new());
        // Installed directly; the in-memory backend only lists today's records
        let all = vec![
            customer_at(7, ServiceType::Forex, CustomerStatus::Waiting, yesterday),
            customer_at(1, ServiceType::Forex, CustomerStatus::Waiting, noon()),
        ];
        store.apply_refresh(Ok(all)).unwrap();

        assert_eq!(store.customers().len(), 2);
        assert_eq!(store.customers_by_status(CustomerStatus::Waiting).len(), 1);
        assert_eq!(store.next_token(), 2);
        assert_eq!(
            store.next_for_teller("1").map(|c| c.token_number),
            Some(1)
        );
        assert!(store.next_for_teller("missing").is_none());
        assert_eq!(store.stats().total_customers, 1);
    }
}
