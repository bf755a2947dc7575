//! Wait time estimation at check-in
//!
//! The estimate is a single-round capacity calculation: customers already
//! waiting for the same service, times the average handling time, spread over
//! the qualified tellers who are not on break. It is computed once when the
//! customer registers and never revised.

use crate::clock::Clock;
use crate::error::QueueError;
use crate::types::{Customer, CustomerStatus, ServiceType, Teller};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longest handling time accepted from configuration, in minutes
pub const MAX_HANDLING_MINUTES: u32 = 24 * 60;

/// Average handling time per service type, in minutes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlingTimes {
    pub international_transfer: u32,
    pub domestic_transfer: u32,
    pub forex: u32,
    pub account_services: u32,
}

impl Default for HandlingTimes {
    fn default() -> Self {
        Self {
            international_transfer: 15,
            domestic_transfer: 10,
            forex: 10,
            account_services: 10,
        }
    }
}

impl HandlingTimes {
    /// Handling time for a service type
    pub fn minutes_for(&self, service_type: ServiceType) -> u32 {
        match service_type {
            ServiceType::InternationalTransfer => self.international_transfer,
            ServiceType::DomesticTransfer => self.domestic_transfer,
            ServiceType::Forex => self.forex,
            ServiceType::AccountServices => self.account_services,
        }
    }
}

/// Configuration for wait time estimation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitTimeConfig {
    /// Estimate returned when no qualified teller is on duty
    pub no_teller_fallback_minutes: u32,
    /// Average handling time table
    pub handling_times: HandlingTimes,
}

impl Default for WaitTimeConfig {
    fn default() -> Self {
        Self {
            no_teller_fallback_minutes: 30,
            handling_times: HandlingTimes::default(),
        }
    }
}

impl WaitTimeConfig {
    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.no_teller_fallback_minutes == 0 {
            return Err(QueueError::ConfigurationError {
                message: "no_teller_fallback_minutes must be greater than 0".to_string(),
            }
            .into());
        }

        for service_type in ServiceType::ALL {
            let minutes = self.handling_times.minutes_for(service_type);
            if minutes == 0 || minutes > MAX_HANDLING_MINUTES {
                return Err(QueueError::ConfigurationError {
                    message: format!(
                        "handling time for {} must be between 1 and {} minutes, got {}",
                        service_type, MAX_HANDLING_MINUTES, minutes
                    ),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Check-in wait estimator
#[derive(Debug, Clone, Default)]
pub struct WaitTimeEstimator {
    config: WaitTimeConfig,
}

impl WaitTimeEstimator {
    /// Create a new estimator, validating its configuration
    pub fn new(config: WaitTimeConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WaitTimeConfig {
        &self.config
    }

    /// Estimated wait in minutes for a new customer of `service_type`
    pub fn estimate(
        &self,
        customers: &[Customer],
        service_type: ServiceType,
        tellers: &[Teller],
        clock: &dyn Clock,
    ) -> u32 {
        let qualified = tellers
            .iter()
            .filter(|teller| teller.handles(service_type) && !teller.is_on_break())
            .count() as u32;

        if qualified == 0 {
            debug!(
                "No teller on duty for {}, using fallback of {} minutes",
                service_type, self.config.no_teller_fallback_minutes
            );
            return self.config.no_teller_fallback_minutes;
        }

        let ahead = customers
            .iter()
            .filter(|customer| {
                customer.service_type == service_type
                    && customer.status == CustomerStatus::Waiting
                    && customer.checked_in_today(clock)
            })
            .count() as u32;

        let handling = self.config.handling_times.minutes_for(service_type);
        let estimate = ahead.saturating_mul(handling).div_ceil(qualified);

        debug!(
            "Estimated wait for {}: {} ahead x {} min / {} tellers = {} min",
            service_type, ahead, handling, qualified, estimate
        );

        estimate
    }
}

/// Estimate with the default handling table and fallback
pub fn estimate_wait(
    customers: &[Customer],
    service_type: ServiceType,
    tellers: &[Teller],
    clock: &dyn Clock,
) -> u32 {
    WaitTimeEstimator::default().estimate(customers, service_type, tellers, clock)
}
