//! Service layer for the teller-queue service
//!
//! This module contains the application state, the refresh loop and the
//! health checks backing the HTTP endpoints.

pub mod app;
pub mod health;
pub mod refresher;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus, ServiceMonitor};
