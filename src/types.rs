//! Common types used throughout the queue service

use crate::clock::{self, Clock};
use crate::error::QueueError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque customer identifier assigned by the remote API
pub type CustomerId = String;

/// Teller identifier from the branch roster
pub type TellerId = String;

/// Feedback entry identifier
pub type FeedbackId = String;

/// Banking service a customer queues for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    InternationalTransfer,
    DomesticTransfer,
    Forex,
    AccountServices,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::InternationalTransfer,
        ServiceType::DomesticTransfer,
        ServiceType::Forex,
        ServiceType::AccountServices,
    ];

    /// Wire name of the service type
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::InternationalTransfer => "international-transfer",
            ServiceType::DomesticTransfer => "domestic-transfer",
            ServiceType::Forex => "forex",
            ServiceType::AccountServices => "account-services",
        }
    }

    /// Human readable label ("International Transfer")
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::InternationalTransfer => "International Transfer",
            ServiceType::DomesticTransfer => "Domestic Transfer",
            ServiceType::Forex => "Forex",
            ServiceType::AccountServices => "Account Services",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| QueueError::invalid_input(format!("unknown service type '{}'", s)))
    }
}

/// Lifecycle status of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Waiting,
    Serving,
    Completed,
    Cancelled,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 4] = [
        CustomerStatus::Waiting,
        CustomerStatus::Serving,
        CustomerStatus::Completed,
        CustomerStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Waiting => "waiting",
            CustomerStatus::Serving => "serving",
            CustomerStatus::Completed => "completed",
            CustomerStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CustomerStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| QueueError::invalid_input(format!("unknown customer status '{}'", s)))
    }
}

/// Lifecycle status of a teller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TellerStatus {
    Available,
    Serving,
    Break,
}

impl fmt::Display for TellerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TellerStatus::Available => write!(f, "available"),
            TellerStatus::Serving => write!(f, "serving"),
            TellerStatus::Break => write!(f, "break"),
        }
    }
}

impl FromStr for TellerStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(TellerStatus::Available),
            "serving" => Ok(TellerStatus::Serving),
            "break" => Ok(TellerStatus::Break),
            other => Err(QueueError::invalid_input(format!(
                "unknown teller status '{}'",
                other
            ))),
        }
    }
}

/// Category a feedback entry is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackCategory {
    ServiceQuality,
    WaitTime,
    StaffBehavior,
    Environment,
    Other,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 5] = [
        FeedbackCategory::ServiceQuality,
        FeedbackCategory::WaitTime,
        FeedbackCategory::StaffBehavior,
        FeedbackCategory::Environment,
        FeedbackCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackCategory::ServiceQuality => "service-quality",
            FeedbackCategory::WaitTime => "wait-time",
            FeedbackCategory::StaffBehavior => "staff-behavior",
            FeedbackCategory::Environment => "environment",
            FeedbackCategory::Other => "other",
        }
    }
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackCategory {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedbackCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| {
                QueueError::invalid_input(format!("unknown feedback category '{}'", s))
            })
    }
}

/// A customer in the branch queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone_number: String,
    /// Per-day sequential token shown on the ticket
    pub token_number: u32,
    pub service_type: ServiceType,
    pub status: CustomerStatus,
    /// Absent when the remote sent an unparseable timestamp
    pub check_in_time: Option<DateTime<Utc>>,
    /// Minutes, fixed at check-in
    pub estimated_wait_time: u32,
    pub start_service_time: Option<DateTime<Utc>>,
    pub end_service_time: Option<DateTime<Utc>>,
    pub teller_id: Option<TellerId>,
}

impl Customer {
    /// Whether the customer checked in on the clock's current calendar day
    pub fn checked_in_today(&self, clock: &dyn Clock) -> bool {
        self.check_in_time
            .as_ref()
            .is_some_and(|ts| clock::is_today(ts, clock))
    }

    /// Minutes between check-in and start of service
    pub fn wait_minutes(&self) -> Option<f64> {
        match (self.check_in_time, self.start_service_time) {
            (Some(check_in), Some(start)) => Some(clock::minutes_between(check_in, start)),
            _ => None,
        }
    }

    /// Minutes between start and end of service
    pub fn service_minutes(&self) -> Option<f64> {
        match (self.start_service_time, self.end_service_time) {
            (Some(start), Some(end)) => Some(clock::minutes_between(start, end)),
            _ => None,
        }
    }
}

/// A teller from the branch roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teller {
    pub id: TellerId,
    pub name: String,
    pub status: TellerStatus,
    /// Service types the teller is qualified to handle
    pub service_types: Vec<ServiceType>,
    pub customers_served: u32,
    pub current_customer_id: Option<CustomerId>,
}

impl Teller {
    /// Create an available teller with no history
    pub fn new(id: impl Into<TellerId>, name: impl Into<String>, service_types: Vec<ServiceType>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TellerStatus::Available,
            service_types,
            customers_served: 0,
            current_customer_id: None,
        }
    }

    /// Check if the teller is qualified for a service type
    pub fn handles(&self, service_type: ServiceType) -> bool {
        self.service_types.contains(&service_type)
    }

    pub fn is_on_break(&self) -> bool {
        self.status == TellerStatus::Break
    }
}

/// Aggregate statistics for today's queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_customers: usize,
    pub waiting_customers: usize,
    /// Check-in to service start, minutes
    pub avg_wait_time: i64,
    /// Service start to service end, minutes
    pub avg_service_time: i64,
}

/// Customer feedback entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub category: FeedbackCategory,
    pub rating: u8,
    pub comment: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Validated registration sent to the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone_number: String,
    pub service_type: ServiceType,
}

/// Validated feedback sent to the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub category: FeedbackCategory,
    pub rating: u8,
    pub comment: String,
}
