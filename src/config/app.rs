//! Main application configuration
//!
//! This module defines the configuration structures for the teller-queue
//! service, including environment variable loading, TOML files and
//! validation.

use crate::config::roster::{default_roster, TellerSettings};
use crate::queue::WaitTimeConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub api: ApiSettings,
    pub queue: QueueSettings,
    /// Teller roster; never changes at runtime
    pub roster: Vec<TellerSettings>,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the health/stats/metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Remote queue API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the queue backend
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Queue behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Interval between resynchronizations with the remote API
    pub refresh_interval_seconds: u64,
    /// Branch offset from UTC in minutes; unset uses the host's local offset
    pub utc_offset_minutes: Option<i32>,
    /// Wait estimation parameters
    pub wait_time: WaitTimeConfig,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "teller-queue".to_string(),
            log_level: "info".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 10,
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8700".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 30,
            utc_offset_minutes: None,
            wait_time: WaitTimeConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", name, value)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            roster: default_roster(),
            ..Self::default()
        };
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still win
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&contents)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse a TOML document; an empty roster falls back to the default one
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: AppConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;
        if config.roster.is_empty() {
            config.roster = default_roster();
        }
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Some(port) = parse_env("HTTP_PORT")? {
            self.service.http_port = port;
        }
        if let Some(timeout) = parse_env("SHUTDOWN_TIMEOUT_SECONDS")? {
            self.service.shutdown_timeout_seconds = timeout;
        }

        // API settings
        if let Ok(url) = env::var("API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = parse_env("API_TIMEOUT_SECONDS")? {
            self.api.request_timeout_seconds = timeout;
        }

        // Queue settings
        if let Some(interval) = parse_env("REFRESH_INTERVAL_SECONDS")? {
            self.queue.refresh_interval_seconds = interval;
        }
        if let Some(offset) = parse_env("BRANCH_UTC_OFFSET_MINUTES")? {
            self.queue.utc_offset_minutes = Some(offset);
        }
        if let Some(fallback) = parse_env("NO_TELLER_FALLBACK_MINUTES")? {
            self.queue.wait_time.no_teller_fallback_minutes = fallback;
        }

        // Roster
        if let Ok(ids) = env::var("TELLERS_ON_BREAK") {
            let ids: Vec<String> = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            self.set_on_break(&ids)?;
        }

        Ok(())
    }

    /// Mark roster tellers as starting on break
    pub fn set_on_break(&mut self, teller_ids: &[String]) -> Result<()> {
        for id in teller_ids {
            let teller = self
                .roster
                .iter_mut()
                .find(|teller| &teller.id == id)
                .ok_or_else(|| anyhow!("Unknown teller id for break: {}", id))?;
            teller.on_break = true;
        }
        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.queue.refresh_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate API settings
    if config.api.base_url.is_empty() {
        return Err(anyhow!("API base URL cannot be empty"));
    }
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://")
    {
        return Err(anyhow!(
            "API base URL must be http(s): {}",
            config.api.base_url
        ));
    }
    if config.api.request_timeout_seconds == 0 {
        return Err(anyhow!("API request timeout must be greater than 0"));
    }

    // Validate queue settings
    if config.queue.refresh_interval_seconds == 0 {
        return Err(anyhow!("Refresh interval must be greater than 0"));
    }
    if let Some(minutes) = config.queue.utc_offset_minutes {
        if crate::clock::offset_from_minutes(minutes).is_none() {
            return Err(anyhow!("Invalid UTC offset: {} minutes", minutes));
        }
    }
    config.queue.wait_time.validate()?;

    // Validate roster
    if config.roster.is_empty() {
        return Err(anyhow!("Teller roster cannot be empty"));
    }
    let mut seen = HashSet::new();
    for teller in &config.roster {
        if !seen.insert(teller.id.as_str()) {
            return Err(anyhow!("Duplicate teller id in roster: {}", teller.id));
        }
        if teller.service_types.is_empty() {
            return Err(anyhow!("Teller {} has no service types", teller.id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceType;

    fn valid_config() -> AppConfig {
        AppConfig {
            roster: default_roster(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = valid_config();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.queue.wait_time.no_teller_fallback_minutes, 30);
        assert_eq!(config.roster.len(), 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = valid_config();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.api.base_url = "ftp://example".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.queue.refresh_interval_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.queue.utc_offset_minutes = Some(24 * 60);
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.roster.push(config.roster[0].clone());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_toml_overrides() {
        let config = AppConfig::from_toml(
            r#"
            [service]
            log_level = "debug"

            [api]
            base_url = "https://queue.example.com/"

            [queue]
            refresh_interval_seconds = 5
            utc_offset_minutes = 120

            [queue.wait_time]
            no_teller_fallback_minutes = 40

            [queue.wait_time.handling_times]
            forex = 7

            [[roster]]
            id = "9"
            name = "Solange"
            service_types = ["forex", "account-services"]
            "#,
        )
        .unwrap();

        assert!(validate_config(&config).is_ok());
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.service.http_port, 8080);
        assert_eq!(config.api.base_url, "https://queue.example.com/");
        assert_eq!(config.queue.refresh_interval_seconds, 5);
        assert_eq!(config.queue.utc_offset_minutes, Some(120));
        assert_eq!(config.queue.wait_time.no_teller_fallback_minutes, 40);
        assert_eq!(
            config
                .queue
                .wait_time
                .handling_times
                .minutes_for(ServiceType::Forex),
            7
        );
        assert_eq!(
            config
                .queue
                .wait_time
                .handling_times
                .minutes_for(ServiceType::InternationalTransfer),
            15
        );
        assert_eq!(config.roster.len(), 1);
        assert_eq!(
            config.roster[0].service_types,
            vec![ServiceType::Forex, ServiceType::AccountServices]
        );
    }

    #[test]
    fn test_set_on_break() {
        let mut config = AppConfig::from_toml("").unwrap();
        config.set_on_break(&["3".to_string()]).unwrap();
        assert!(config.roster[2].on_break);
        assert!(!config.roster[0].on_break);

        assert!(config.set_on_break(&["42".to_string()]).is_err());

        let config = AppConfig::from_toml(
            r#"
            [[roster]]
            id = "1"
            name = "Jean Bosco"
            service_types = ["forex"]
            on_break = true
            "#,
        )
        .unwrap();
        assert!(config.roster[0].on_break);
    }

    #[test]
    fn test_empty_toml_uses_default_roster() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.roster, default_roster());
        assert!(validate_config(&config).is_ok());
    }
}
