//! Error types for the queue service
//!
//! Operations propagate `anyhow` errors; the variants below are the domain
//! failures callers are expected to inspect (via `downcast_ref`).

use crate::types::{CustomerId, CustomerStatus, TellerId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific queue scenarios
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Remote request failed: {message}")]
    Transport { message: String },

    #[error("Remote API returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("Malformed remote response: {message}")]
    MalformedResponse { message: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Customer {customer_id} cannot move from {from} to {to}")]
    InvalidTransition {
        customer_id: CustomerId,
        from: CustomerStatus,
        to: CustomerStatus,
    },

    #[error("Teller {teller_id} is serving a customer")]
    TellerBusy { teller_id: TellerId },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl QueueError {
    /// Shorthand for a validation failure
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        QueueError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// True for failures that happened at the remote boundary
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            QueueError::Transport { .. }
                | QueueError::RemoteStatus { .. }
                | QueueError::MalformedResponse { .. }
        )
    }
}
