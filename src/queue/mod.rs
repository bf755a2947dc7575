//! Queue arithmetic over today's customers
//!
//! Token assignment, wait estimation, teller dispatch, the customer status
//! state machine and daily statistics. Everything here is a pure function of
//! the customer/teller lists and a [`crate::clock::Clock`].

pub mod dispatch;
pub mod estimator;
pub mod lifecycle;
pub mod statistics;
pub mod token;

// Re-export commonly used types
pub use dispatch::{customers_by_status, next_for_teller};
pub use estimator::{estimate_wait, HandlingTimes, WaitTimeConfig, WaitTimeEstimator};
pub use statistics::{
    compute_stats, recently_completed, service_breakdown, teller_performance, ServiceBreakdown,
    TellerPerformance,
};
pub use token::next_token_number;

#[cfg(test)]
pub(crate) mod testing;
