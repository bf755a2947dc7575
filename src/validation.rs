//! Input validation for registrations and feedback
//!
//! Validation runs before anything is sent to the remote API; a request that
//! fails here never reaches the gateway.

use crate::error::QueueError;
use crate::types::{FeedbackCategory, NewCustomer, NewFeedback, ServiceType};
use serde::{Deserialize, Serialize};

/// Length of a local mobile number, including the leading "07"
const PHONE_DIGITS: usize = 10;
const PHONE_PREFIX: &str = "07";

/// Raw registration input as typed by the customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub phone_number: String,
    pub service_type: ServiceType,
}

impl RegistrationRequest {
    pub fn new(
        name: impl Into<String>,
        phone_number: impl Into<String>,
        service_type: ServiceType,
    ) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
            service_type,
        }
    }

    /// Validate and normalise into the record sent to the remote API
    pub fn validate(&self) -> Result<NewCustomer, QueueError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(QueueError::invalid_input("name is required"));
        }

        Ok(NewCustomer {
            name: name.to_string(),
            phone_number: normalize_phone_number(&self.phone_number)?,
            service_type: self.service_type,
        })
    }
}

/// Strip whitespace and check the number is "07" followed by eight digits
pub fn normalize_phone_number(raw: &str) -> Result<String, QueueError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(QueueError::invalid_input("phone number is required"));
    }

    let valid = cleaned.len() == PHONE_DIGITS
        && cleaned.starts_with(PHONE_PREFIX)
        && cleaned.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(QueueError::invalid_input(format!(
            "'{}' is not a valid mobile number (expected e.g. 0712345678)",
            raw.trim()
        )));
    }

    Ok(cleaned)
}

/// Raw feedback input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub category: FeedbackCategory,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

impl FeedbackRequest {
    pub fn new(category: FeedbackCategory, rating: i64, comment: impl Into<String>) -> Self {
        Self {
            category,
            rating,
            comment: comment.into(),
        }
    }

    /// Validate the rating range and trim the comment
    pub fn validate(&self) -> Result<NewFeedback, QueueError> {
        let rating = u8::try_from(self.rating)
            .ok()
            .filter(|rating| (1..=5).contains(rating))
            .ok_or_else(|| {
                QueueError::invalid_input(format!(
                    "rating must be between 1 and 5, got {}",
                    self.rating
                ))
            })?;

        Ok(NewFeedback {
            category: self.category,
            rating,
            comment: self.comment.trim().to_string(),
        })
    }
}
