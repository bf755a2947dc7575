//! Teller Queue - bank-branch queue management
//!
//! This crate issues per-day tokens to customers, estimates their wait,
//! dispatches them to qualified tellers and aggregates the day's queue
//! statistics. State is mirrored from a remote queue API through the
//! [`gateway::QueueGateway`] boundary.

pub mod clock;
pub mod config;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use clock::{Clock, FixedClock, SystemClock};
pub use gateway::{HttpGateway, InMemoryGateway, QueueGateway};
pub use store::{MutationOutcome, QueueStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
