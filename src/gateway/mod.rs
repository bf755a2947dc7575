//! Remote data gateway
//!
//! The only I/O boundary of the crate. Implementations translate between the
//! remote API's snake_case records with string timestamps (see [`wire`]) and
//! the internal [`crate::types`] records.

pub mod http;
pub mod memory;
pub mod wire;

pub use http::HttpGateway;
pub use memory::InMemoryGateway;

use crate::error::Result;
use crate::types::{Customer, CustomerStatus, Feedback, NewCustomer, NewFeedback, TellerId};
use async_trait::async_trait;

/// Operations against the remote queue API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// Fetch the remote customer list
    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Register a customer; the remote assigns id, token and check-in time
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer>;

    /// Persist a status change, optionally naming the teller involved
    async fn update_customer_status(
        &self,
        customer_id: &str,
        status: CustomerStatus,
        teller_id: Option<TellerId>,
    ) -> Result<()>;

    /// Fetch all feedback, newest first
    async fn list_feedback(&self) -> Result<Vec<Feedback>>;

    /// Store a feedback entry
    async fn create_feedback(&self, feedback: NewFeedback) -> Result<Feedback>;
}
