//! Optimistic store mutations
//!
//! Each `begin_*` applies a change locally and returns a [`Prepared`] value.
//! The caller sends the pending remote call (without holding the store if it
//! is shared) and hands the result to [`QueueStore::settle`]. `commit` and the
//! convenience wrappers do both steps in one go.

use crate::error::{QueueError, Result};
use crate::store::outcome::{MutationKind, MutationOutcome, PendingMutation, Prepared, SkipReason};
use crate::store::QueueStore;
use crate::types::{CustomerStatus, TellerStatus};
use tracing::{debug, error, info, warn};

impl QueueStore {
    /// Call the next qualified customer to a teller
    pub fn begin_assign(&mut self, teller_id: &str) -> Result<Prepared> {
        let Some(teller_index) = self.teller_index(teller_id) else {
            return Ok(skip(MutationKind::Assign, SkipReason::TellerNotFound));
        };

        match self.tellers[teller_index].status {
            TellerStatus::Serving => return Ok(skip(MutationKind::Assign, SkipReason::TellerBusy)),
            TellerStatus::Break => {
                return Ok(skip(MutationKind::Assign, SkipReason::TellerOnBreak))
            }
            TellerStatus::Available => {}
        }

        let Some(customer_id) = self
            .next_for_teller(teller_id)
            .map(|customer| customer.id.clone())
        else {
            debug!("No waiting customer for teller {}", teller_id);
            return Ok(skip(MutationKind::Assign, SkipReason::NoWaitingCustomer));
        };
        let Some(customer_index) = self.customer_index(&customer_id) else {
            return Ok(skip(MutationKind::Assign, SkipReason::CustomerNotFound));
        };

        let now = self.clock.now();
        let pending = PendingMutation {
            kind: MutationKind::Assign,
            customer_id: customer_id.clone(),
            status: CustomerStatus::Serving,
            teller_id: Some(teller_id.to_string()),
            customer_before: self.customers[customer_index].clone(),
            teller_before: Some(self.tellers[teller_index].clone()),
        };

        let customer = &mut self.customers[customer_index];
        customer.status = CustomerStatus::Serving;
        customer.start_service_time = Some(now);
        customer.teller_id = Some(teller_id.to_string());

        let teller = &mut self.tellers[teller_index];
        teller.status = TellerStatus::Serving;
        teller.current_customer_id = Some(customer_id);

        self.recompute_stats();
        self.bump_generation();
        Ok(Prepared::Pending(pending))
    }

    /// Finish the teller's current customer
    pub fn begin_complete(&mut self, teller_id: &str) -> Result<Prepared> {
        let Some(teller_index) = self.teller_index(teller_id) else {
            return Ok(skip(MutationKind::Complete, SkipReason::TellerNotFound));
        };
        let Some(customer_id) = self.tellers[teller_index].current_customer_id.clone() else {
            return Ok(skip(MutationKind::Complete, SkipReason::NoCurrentCustomer));
        };
        let Some(customer_index) = self.customer_index(&customer_id) else {
            return Ok(skip(MutationKind::Complete, SkipReason::CustomerNotFound));
        };

        let from = self.customers[customer_index].status;
        if !from.can_transition_to(CustomerStatus::Completed) {
            return Err(QueueError::InvalidTransition {
                customer_id,
                from,
                to: CustomerStatus::Completed,
            }
            .into());
        }

        let now = self.clock.now();
        let pending = PendingMutation {
            kind: MutationKind::Complete,
            customer_id,
            status: CustomerStatus::Completed,
            teller_id: Some(teller_id.to_string()),
            customer_before: self.customers[customer_index].clone(),
            teller_before: Some(self.tellers[teller_index].clone()),
        };

        let customer = &mut self.customers[customer_index];
        customer.status = CustomerStatus::Completed;
        customer.end_service_time = Some(now);

        let teller = &mut self.tellers[teller_index];
        teller.status = TellerStatus::Available;
        teller.current_customer_id = None;
        teller.customers_served += 1;

        self.recompute_stats();
        self.bump_generation();
        Ok(Prepared::Pending(pending))
    }

    /// Move a customer to another status
    ///
    /// Moving to `serving` needs a teller and goes through
    /// [`begin_assign`](Self::begin_assign). Leaving `serving` frees the
    /// teller; only completion counts towards its served total.
    pub fn begin_status_update(
        &mut self,
        customer_id: &str,
        status: CustomerStatus,
    ) -> Result<Prepared> {
        let Some(customer_index) = self.customer_index(customer_id) else {
            return Ok(skip(MutationKind::StatusUpdate, SkipReason::CustomerNotFound));
        };

        let from = self.customers[customer_index].status;
        if from == status {
            return Ok(skip(MutationKind::StatusUpdate, SkipReason::Unchanged));
        }
        if !from.can_transition_to(status) {
            return Err(QueueError::InvalidTransition {
                customer_id: customer_id.to_string(),
                from,
                to: status,
            }
            .into());
        }
        if status == CustomerStatus::Serving {
            return Err(QueueError::invalid_input(
                "serving requires a teller; assign the customer to a teller instead",
            )
            .into());
        }

        // Only a serving customer holds a teller
        let teller_index = if from == CustomerStatus::Serving {
            self.tellers
                .iter()
                .position(|teller| teller.current_customer_id.as_deref() == Some(customer_id))
                .or_else(|| {
                    self.customers[customer_index]
                        .teller_id
                        .as_deref()
                        .and_then(|teller_id| self.teller_index(teller_id))
                })
        } else {
            None
        };

        let now = self.clock.now();
        let customer_before = self.customers[customer_index].clone();
        let pending = PendingMutation {
            kind: MutationKind::StatusUpdate,
            customer_id: customer_id.to_string(),
            status,
            teller_id: customer_before.teller_id.clone(),
            teller_before: teller_index.map(|index| self.tellers[index].clone()),
            customer_before,
        };

        let customer = &mut self.customers[customer_index];
        customer.status = status;
        customer.end_service_time = Some(now);

        if let Some(index) = teller_index {
            let teller = &mut self.tellers[index];
            if teller.current_customer_id.as_deref() == Some(customer_id) {
                teller.current_customer_id = None;
                if teller.status == TellerStatus::Serving {
                    teller.status = TellerStatus::Available;
                }
            }
            if status == CustomerStatus::Completed {
                teller.customers_served += 1;
            }
        }

        self.recompute_stats();
        self.bump_generation();
        Ok(Prepared::Pending(pending))
    }

    /// Send a prepared mutation and settle it
    pub async fn commit(&mut self, prepared: Prepared) -> MutationOutcome {
        match prepared {
            Prepared::Skipped(reason) => MutationOutcome::Skipped(reason),
            Prepared::Pending(pending) => {
                let gateway = self.gateway();
                let result = pending.send(gateway.as_ref()).await;
                self.settle(pending, result)
            }
        }
    }

    /// Keep or revert a pending mutation given its remote result
    pub fn settle(&mut self, pending: PendingMutation, result: Result<()>) -> MutationOutcome {
        self.bump_generation();
        match result {
            Ok(()) => {
                info!(
                    "{} of customer {} applied ({})",
                    pending.kind, pending.customer_id, pending.status
                );
                MutationOutcome::Applied
            }
            Err(e) => {
                error!(
                    "{} of customer {} failed, rolling back: {}",
                    pending.kind, pending.customer_id, e
                );
                self.restore(pending);
                MutationOutcome::RolledBack(e.to_string())
            }
        }
    }

    fn restore(&mut self, pending: PendingMutation) {
        let PendingMutation {
            customer_before,
            teller_before,
            ..
        } = pending;

        match self.customer_index(&customer_before.id) {
            Some(index) => self.customers[index] = customer_before,
            None => warn!(
                "Customer {} vanished before rollback; leaving it to the next refresh",
                customer_before.id
            ),
        }

        if let Some(teller) = teller_before {
            if let Some(index) = self.teller_index(&teller.id) {
                self.tellers[index] = teller;
            }
        }

        self.recompute_stats();
    }

    /// Call the next customer to a teller and persist it
    pub async fn assign_next(&mut self, teller_id: &str) -> Result<MutationOutcome> {
        let prepared = self.begin_assign(teller_id)?;
        Ok(self.commit(prepared).await)
    }

    /// Complete the teller's current customer and persist it
    pub async fn complete_service(&mut self, teller_id: &str) -> Result<MutationOutcome> {
        let prepared = self.begin_complete(teller_id)?;
        Ok(self.commit(prepared).await)
    }

    /// Change a customer's status and persist it
    pub async fn update_customer_status(
        &mut self,
        customer_id: &str,
        status: CustomerStatus,
    ) -> Result<MutationOutcome> {
        let prepared = self.begin_status_update(customer_id, status)?;
        Ok(self.commit(prepared).await)
    }

    /// Change a teller's availability; local only
    ///
    /// `serving` is entered by assignment, never set directly, and a teller
    /// cannot go on break while serving.
    pub fn set_teller_status(
        &mut self,
        teller_id: &str,
        status: TellerStatus,
    ) -> Result<MutationOutcome> {
        let Some(index) = self.teller_index(teller_id) else {
            return Ok(MutationOutcome::Skipped(SkipReason::TellerNotFound));
        };

        let teller = &mut self.tellers[index];
        if teller.status == status {
            return Ok(MutationOutcome::Skipped(SkipReason::Unchanged));
        }
        if status == TellerStatus::Serving {
            return Err(QueueError::invalid_input(
                "a teller starts serving by being assigned a customer",
            )
            .into());
        }
        if teller.status == TellerStatus::Serving {
            return Err(QueueError::TellerBusy {
                teller_id: teller_id.to_string(),
            }
            .into());
        }

        info!("Teller {} is now {}", teller.id, status);
        teller.status = status;
        Ok(MutationOutcome::Applied)
    }
}

fn skip(kind: MutationKind, reason: SkipReason) -> Prepared {
    debug!("{} skipped: {}", kind, reason);
    Prepared::Skipped(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockQueueGateway, QueueGateway};
    use crate::queue::testing::{customer_at, noon, served};
    use crate::queue::WaitTimeEstimator;
    use crate::store::tests::{clock, roster, store_with};
    use crate::types::{Customer, ServiceType};
    use chrono::Duration;
    use std::sync::Arc;

    fn waiting(token: u32, service_type: ServiceType) -> Customer {
        customer_at(
            token,
            service_type,
            CustomerStatus::Waiting,
            noon() - Duration::minutes(20),
        )
    }

    fn failing_gateway() -> MockQueueGateway {
        let mut gateway = MockQueueGateway::new();
        gateway
            .expect_update_customer_status()
            .returning(|_, _, _| {
                Err(QueueError::RemoteStatus {
                    status: 500,
                    message: "boom".to_string(),
                }
                .into())
            });
        gateway
    }

    fn mock_store(gateway: MockQueueGateway, customers: Vec<Customer>) -> QueueStore {
        let mut store = QueueStore::new(
            Arc::new(gateway),
            clock(),
            roster(),
            WaitTimeEstimator::default(),
        );
        store.apply_refresh(Ok(customers)).unwrap();
        store
    }

    #[tokio::test]
    async fn test_assign_picks_lowest_qualified_token() {
        let (mut store, gateway) = store_with(vec![
            waiting(1, ServiceType::AccountServices),
            waiting(2, ServiceType::Forex),
            waiting(3, ServiceType::InternationalTransfer),
        ]);
        store.refresh().await.unwrap();

        let outcome = store.assign_next("1").await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);

        let customer = store.customer("customer-2").unwrap();
        assert_eq!(customer.status, CustomerStatus::Serving);
        assert_eq!(customer.teller_id.as_deref(), Some("1"));
        assert_eq!(customer.start_service_time, Some(noon()));

        let teller = store.teller("1").unwrap();
        assert_eq!(teller.status, TellerStatus::Serving);
        assert_eq!(teller.current_customer_id.as_deref(), Some("customer-2"));

        // The remote agrees after a refresh
        store.refresh().await.unwrap();
        assert_eq!(
            store.customer("customer-2").unwrap().status,
            CustomerStatus::Serving
        );
        assert_eq!(store.stats().avg_wait_time, 20);
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn test_assign_skips() {
        let (mut store, _) = store_with(vec![waiting(1, ServiceType::AccountServices)]);
        store.refresh().await.unwrap();

        assert_eq!(
            store.assign_next("9").await.unwrap(),
            MutationOutcome::Skipped(SkipReason::TellerNotFound)
        );
        assert_eq!(
            store.assign_next("1").await.unwrap(),
            MutationOutcome::Skipped(SkipReason::NoWaitingCustomer)
        );

        store.set_teller_status("3", TellerStatus::Break).unwrap();
        assert_eq!(
            store.assign_next("3").await.unwrap(),
            MutationOutcome::Skipped(SkipReason::TellerOnBreak)
        );

        store.set_teller_status("3", TellerStatus::Available).unwrap();
        assert!(store.assign_next("3").await.unwrap().is_applied());
        assert_eq!(
            store.assign_next("3").await.unwrap(),
            MutationOutcome::Skipped(SkipReason::TellerBusy)
        );
    }

    #[tokio::test]
    async fn test_complete_frees_teller_and_counts() {
        let (mut store, _) = store_with(vec![waiting(1, ServiceType::Forex)]);
        store.refresh().await.unwrap();
        store.assign_next("1").await.unwrap();

        let outcome = store.complete_service("1").await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);

        let teller = store.teller("1").unwrap();
        assert_eq!(teller.status, TellerStatus::Available);
        assert_eq!(teller.current_customer_id, None);
        assert_eq!(teller.customers_served, 1);
        assert_eq!(
            store.customer("customer-1").unwrap().status,
            CustomerStatus::Completed
        );

        // Remote-derived counter matches after a refresh
        store.refresh().await.unwrap();
        assert_eq!(store.teller("1").unwrap().customers_served, 1);

        assert_eq!(
            store.complete_service("1").await.unwrap(),
            MutationOutcome::Skipped(SkipReason::NoCurrentCustomer)
        );
    }

    #[tokio::test]
    async fn test_failed_assign_rolls_back_exactly() {
        let mut store = mock_store(failing_gateway(), vec![waiting(1, ServiceType::Forex)]);
        let customer_before = store.customer("customer-1").cloned().unwrap();
        let teller_before = store.teller("1").cloned().unwrap();
        let stats_before = store.stats();

        let prepared = store.begin_assign("1").unwrap();
        assert_eq!(prepared.outcome(), MutationOutcome::Pending);
        assert_eq!(store.teller("1").unwrap().status, TellerStatus::Serving);
        assert_eq!(store.stats().waiting_customers, 0);

        let outcome = store.commit(prepared).await;
        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        assert_eq!(store.customer("customer-1"), Some(&customer_before));
        assert_eq!(store.teller("1"), Some(&teller_before));
        assert_eq!(store.stats(), stats_before);
    }

    #[tokio::test]
    async fn test_failed_complete_rolls_back_exactly() {
        let mut store = mock_store(
            failing_gateway(),
            vec![served(1, ServiceType::Forex, 5, None, "1")],
        );
        let teller_before = store.teller("1").cloned().unwrap();
        assert_eq!(teller_before.status, TellerStatus::Serving);

        let outcome = store.complete_service("1").await.unwrap();
        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));

        assert_eq!(store.teller("1"), Some(&teller_before));
        let customer = store.customer("customer-1").unwrap();
        assert_eq!(customer.status, CustomerStatus::Serving);
        assert_eq!(customer.end_service_time, None);
    }

    #[tokio::test]
    async fn test_split_mutation_against_shared_gateway() {
        let mut gateway = MockQueueGateway::new();
        gateway
            .expect_update_customer_status()
            .withf(|id, status, teller| {
                id == "customer-1"
                    && *status == CustomerStatus::Serving
                    && teller.as_deref() == Some("2")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut store = mock_store(gateway, vec![waiting(1, ServiceType::DomesticTransfer)]);

        let Prepared::Pending(pending) = store.begin_assign("2").unwrap() else {
            panic!("expected a pending mutation");
        };
        assert_eq!(pending.kind(), MutationKind::Assign);
        assert_eq!(pending.teller_id(), Some("2"));

        let gateway: Arc<dyn QueueGateway> = store.gateway();
        let result = pending.send(gateway.as_ref()).await;
        assert_eq!(store.settle(pending, result), MutationOutcome::Applied);
        assert_eq!(store.teller("2").unwrap().status, TellerStatus::Serving);
    }

    #[tokio::test]
    async fn test_status_update_transitions() {
        let (mut store, _) = store_with(vec![
            waiting(1, ServiceType::Forex),
            served(2, ServiceType::DomesticTransfer, 5, None, "3"),
        ]);
        store.refresh().await.unwrap();
        assert_eq!(store.teller("3").unwrap().status, TellerStatus::Serving);

        // Waiting -> cancelled
        assert!(store
            .update_customer_status("customer-1", CustomerStatus::Cancelled)
            .await
            .unwrap()
            .is_applied());
        let cancelled = store.customer("customer-1").unwrap();
        assert_eq!(cancelled.status, CustomerStatus::Cancelled);
        assert!(cancelled.end_service_time.is_some());

        // Serving -> cancelled frees the teller without counting
        assert!(store
            .update_customer_status("customer-2", CustomerStatus::Cancelled)
            .await
            .unwrap()
            .is_applied());
        let teller = store.teller("3").unwrap();
        assert_eq!(teller.status, TellerStatus::Available);
        assert_eq!(teller.current_customer_id, None);
        assert_eq!(teller.customers_served, 0);

        // Terminal states cannot be left
        let err = store
            .update_customer_status("customer-2", CustomerStatus::Waiting)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::InvalidTransition { .. })
        ));

        assert_eq!(
            store
                .update_customer_status("customer-2", CustomerStatus::Cancelled)
                .await
                .unwrap(),
            MutationOutcome::Skipped(SkipReason::Unchanged)
        );
        assert_eq!(
            store
                .update_customer_status("missing", CustomerStatus::Cancelled)
                .await
                .unwrap(),
            MutationOutcome::Skipped(SkipReason::CustomerNotFound)
        );
    }

    #[tokio::test]
    async fn test_serving_via_status_update_needs_teller() {
        let (mut store, gateway) = store_with(vec![waiting(1, ServiceType::Forex)]);
        store.refresh().await.unwrap();
        let calls = gateway.call_count();

        let err = store
            .update_customer_status("customer-1", CustomerStatus::Serving)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::InvalidInput { .. })
        ));
        assert_eq!(gateway.call_count(), calls);
        assert_eq!(
            store.customer("customer-1").unwrap().status,
            CustomerStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_break_rules() {
        let (mut store, _) = store_with(vec![served(1, ServiceType::Forex, 5, None, "1")]);
        store.refresh().await.unwrap();

        let err = store.set_teller_status("1", TellerStatus::Break).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::TellerBusy { .. })
        ));
        assert!(store
            .set_teller_status("2", TellerStatus::Serving)
            .is_err());

        assert_eq!(
            store.set_teller_status("2", TellerStatus::Break).unwrap(),
            MutationOutcome::Applied
        );
        assert_eq!(
            store.set_teller_status("2", TellerStatus::Break).unwrap(),
            MutationOutcome::Skipped(SkipReason::Unchanged)
        );
        assert_eq!(
            store.set_teller_status("9", TellerStatus::Break).unwrap(),
            MutationOutcome::Skipped(SkipReason::TellerNotFound)
        );

        // Break survives a refresh
        store.refresh().await.unwrap();
        assert!(store.teller("2").unwrap().is_on_break());
    }
}
