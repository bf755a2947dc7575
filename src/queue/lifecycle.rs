//! Customer status state machine
//!
//! ```text
//! waiting ──> serving ──> completed
//!    │           │
//!    └──────┬────┘
//!           v
//!       cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal.

use crate::types::CustomerStatus;

impl CustomerStatus {
    /// No transition leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, CustomerStatus::Completed | CustomerStatus::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: CustomerStatus) -> bool {
        matches!(
            (self, next),
            (CustomerStatus::Waiting, CustomerStatus::Serving)
                | (CustomerStatus::Waiting, CustomerStatus::Cancelled)
                | (CustomerStatus::Serving, CustomerStatus::Completed)
                | (CustomerStatus::Serving, CustomerStatus::Cancelled)
        )
    }

    /// States reachable in one step
    pub fn successors(&self) -> Vec<CustomerStatus> {
        CustomerStatus::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }
}
