//! In-memory stand-in for the remote queue API
//!
//! Behaves like the backend service: assigns ids, per-day tokens and check-in
//! times, stamps service start/end on status changes and only lists today's
//! customers. Used for offline runs and tests; it can be switched to fail
//! every call to exercise rollback paths.

use crate::clock::Clock;
use crate::error::{QueueError, Result};
use crate::gateway::QueueGateway;
use crate::queue::next_token_number;
use crate::types::{
    Customer, CustomerStatus, Feedback, NewCustomer, NewFeedback, TellerId,
};
use crate::utils::{generate_customer_id, generate_feedback_id};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Default estimate the backend attaches to new customers
pub const DEFAULT_REMOTE_WAIT_MINUTES: u32 = 15;

/// In-memory queue backend
pub struct InMemoryGateway {
    clock: Arc<dyn Clock>,
    customers: Mutex<Vec<Customer>>,
    feedback: Mutex<Vec<Feedback>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryGateway {
    /// Create an empty backend
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            customers: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a backend preloaded with customers
    pub fn with_customers(clock: Arc<dyn Clock>, customers: Vec<Customer>) -> Self {
        let gateway = Self::new(clock);
        if let Ok(mut stored) = gateway.customers.lock() {
            *stored = customers;
        }
        gateway
    }

    /// Make every subsequent call fail with a transport error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of calls received so far (for testing)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// All stored customers, including earlier days (for testing)
    pub fn stored_customers(&self) -> Vec<Customer> {
        self.customers
            .lock()
            .map(|customers| customers.clone())
            .unwrap_or_default()
    }

    fn begin_call(&self, operation: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::Transport {
                message: format!("{}: remote unavailable", operation),
            }
            .into());
        }
        Ok(())
    }

    fn lock_customers(&self) -> Result<std::sync::MutexGuard<'_, Vec<Customer>>> {
        self.customers.lock().map_err(|_| {
            QueueError::InternalError {
                message: "Failed to acquire customers lock".to_string(),
            }
            .into()
        })
    }

    fn lock_feedback(&self) -> Result<std::sync::MutexGuard<'_, Vec<Feedback>>> {
        self.feedback.lock().map_err(|_| {
            QueueError::InternalError {
                message: "Failed to acquire feedback lock".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl QueueGateway for InMemoryGateway {
    async fn list_customers(&self) -> Result<Vec<Customer>> {
        self.begin_call("list customers")?;
        let customers = self.lock_customers()?;

        Ok(customers
            .iter()
            .filter(|customer| customer.checked_in_today(self.clock.as_ref()))
            .cloned()
            .collect())
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        self.begin_call("create customer")?;
        let mut customers = self.lock_customers()?;

        let created = Customer {
            id: generate_customer_id(),
            name: customer.name,
            phone_number: customer.phone_number,
            token_number: next_token_number(&customers, self.clock.as_ref()),
            service_type: customer.service_type,
            status: CustomerStatus::Waiting,
            check_in_time: Some(self.clock.now()),
            estimated_wait_time: DEFAULT_REMOTE_WAIT_MINUTES,
            start_service_time: None,
            end_service_time: None,
            teller_id: None,
        };

        debug!(
            "In-memory backend registered {} with token {}",
            created.id, created.token_number
        );
        customers.push(created.clone());
        Ok(created)
    }

    async fn update_customer_status(
        &self,
        customer_id: &str,
        status: CustomerStatus,
        teller_id: Option<TellerId>,
    ) -> Result<()> {
        self.begin_call("update customer status")?;
        let mut customers = self.lock_customers()?;
        let now = self.clock.now();

        let customer = customers
            .iter_mut()
            .find(|customer| customer.id == customer_id)
            .ok_or_else(|| QueueError::RemoteStatus {
                status: 404,
                message: "Customer not found".to_string(),
            })?;

        customer.status = status;
        match status {
            CustomerStatus::Serving => {
                customer.start_service_time = Some(now);
                customer.teller_id = teller_id;
            }
            CustomerStatus::Completed | CustomerStatus::Cancelled => {
                customer.end_service_time = Some(now);
            }
            CustomerStatus::Waiting => {}
        }

        Ok(())
    }

    async fn list_feedback(&self) -> Result<Vec<Feedback>> {
        self.begin_call("list feedback")?;
        let feedback = self.lock_feedback()?;

        let mut entries = feedback.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> Result<Feedback> {
        self.begin_call("create feedback")?;
        let mut stored = self.lock_feedback()?;

        let created = Feedback {
            id: generate_feedback_id(),
            category: feedback.category,
            rating: feedback.rating,
            comment: feedback.comment,
            created_at: Some(self.clock.now()),
        };
        stored.push(created.clone());
        Ok(created)
    }
}
