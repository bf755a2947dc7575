//! Configuration management for the teller-queue service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod roster;

// Re-export commonly used types
pub use app::{validate_config, ApiSettings, AppConfig, QueueSettings, ServiceSettings};
pub use roster::{default_roster, TellerSettings};
