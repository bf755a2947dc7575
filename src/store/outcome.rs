//! Optimistic mutation bookkeeping
//!
//! A mutation is applied to the local state first and handed back as a
//! [`PendingMutation`] carrying a snapshot of everything it touched. Once the
//! remote call has finished the store settles it: success keeps the local
//! change, failure puts the snapshot back.

use crate::error::Result;
use crate::gateway::QueueGateway;
use crate::types::{Customer, CustomerId, CustomerStatus, Teller, TellerId};
use serde::Serialize;
use std::fmt;

/// Final (or intermediate) state of a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The remote accepted the change
    Applied,
    /// Applied locally, remote call not yet settled
    Pending,
    /// The remote call failed and the local change was reverted
    RolledBack(String),
    /// Nothing to do; no local or remote change happened
    Skipped(SkipReason),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }

    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            MutationOutcome::Applied => "applied",
            MutationOutcome::Pending => "pending",
            MutationOutcome::RolledBack(_) => "rolled_back",
            MutationOutcome::Skipped(_) => "skipped",
        }
    }
}

impl fmt::Display for MutationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOutcome::Applied => write!(f, "applied"),
            MutationOutcome::Pending => write!(f, "pending"),
            MutationOutcome::RolledBack(reason) => write!(f, "rolled back: {}", reason),
            MutationOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Why a mutation was a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TellerNotFound,
    CustomerNotFound,
    TellerBusy,
    TellerOnBreak,
    NoWaitingCustomer,
    NoCurrentCustomer,
    Unchanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::TellerNotFound => "teller not found",
            SkipReason::CustomerNotFound => "customer not found",
            SkipReason::TellerBusy => "teller is already serving",
            SkipReason::TellerOnBreak => "teller is on break",
            SkipReason::NoWaitingCustomer => "no waiting customer for this teller",
            SkipReason::NoCurrentCustomer => "teller has no current customer",
            SkipReason::Unchanged => "status unchanged",
        };
        f.write_str(text)
    }
}

/// Kind of store mutation, for logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Assign,
    Complete,
    StatusUpdate,
    TellerStatus,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Assign => "assign",
            MutationKind::Complete => "complete",
            MutationKind::StatusUpdate => "status_update",
            MutationKind::TellerStatus => "teller_status",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally applied change awaiting its remote call
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub(crate) kind: MutationKind,
    pub(crate) customer_id: CustomerId,
    pub(crate) status: CustomerStatus,
    pub(crate) teller_id: Option<TellerId>,
    pub(crate) customer_before: Customer,
    pub(crate) teller_before: Option<Teller>,
}

impl PendingMutation {
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Status being written to the remote
    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    pub fn teller_id(&self) -> Option<&str> {
        self.teller_id.as_deref()
    }

    /// Issue the remote status update
    ///
    /// Needs no access to the store, so callers sharing the store behind a
    /// lock can release it for the duration of the call.
    pub async fn send(&self, gateway: &dyn QueueGateway) -> Result<()> {
        gateway
            .update_customer_status(&self.customer_id, self.status, self.teller_id.clone())
            .await
    }
}

/// Result of the local half of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Pending(PendingMutation),
    Skipped(SkipReason),
}

impl Prepared {
    pub fn outcome(&self) -> MutationOutcome {
        match self {
            Prepared::Pending(_) => MutationOutcome::Pending,
            Prepared::Skipped(reason) => MutationOutcome::Skipped(*reason),
        }
    }

    pub fn pending(&self) -> Option<&PendingMutation> {
        match self {
            Prepared::Pending(pending) => Some(pending),
            Prepared::Skipped(_) => None,
        }
    }
}
