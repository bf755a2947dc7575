//! Wire records exchanged with the remote queue API
//!
//! Field names are snake_case and timestamps are strings. Timestamps that are
//! missing, null, non-string or unparseable become `None` on the way in.
//! Enumerations stay as strings here so one bad record cannot fail a whole
//! list; conversion to the internal types rejects just that record.

use crate::clock::{format_timestamp, parse_timestamp};
use crate::error::QueueError;
use crate::types::{
    Customer, CustomerStatus, Feedback, FeedbackCategory, NewCustomer, NewFeedback, ServiceType,
};
use chrono::FixedOffset;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accept any JSON value for a timestamp field, keeping only strings
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

/// Customer as returned by `GET /customers/` and `POST /customers/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub token_number: u32,
    pub service_type: String,
    pub status: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub check_in_time: Option<String>,
    #[serde(default)]
    pub estimated_wait_time: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_service_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_service_time: Option<String>,
    #[serde(default)]
    pub teller_id: Option<String>,
}

impl CustomerRecord {
    /// Convert into the internal record, reading naive timestamps in `offset`
    pub fn into_customer(self, offset: FixedOffset) -> Result<Customer, QueueError> {
        let parse = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|text| parse_timestamp(text, offset))
        };

        Ok(Customer {
            service_type: self.service_type.parse::<ServiceType>()?,
            status: self.status.parse::<CustomerStatus>()?,
            check_in_time: parse(&self.check_in_time),
            start_service_time: parse(&self.start_service_time),
            end_service_time: parse(&self.end_service_time),
            id: self.id,
            name: self.name,
            phone_number: self.phone_number,
            token_number: self.token_number,
            estimated_wait_time: self.estimated_wait_time,
            teller_id: self.teller_id.filter(|id| !id.is_empty()),
        })
    }
}

impl From<&Customer> for CustomerRecord {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.clone(),
            name: customer.name.clone(),
            phone_number: customer.phone_number.clone(),
            token_number: customer.token_number,
            service_type: customer.service_type.as_str().to_string(),
            status: customer.status.as_str().to_string(),
            check_in_time: customer.check_in_time.as_ref().map(format_timestamp),
            estimated_wait_time: customer.estimated_wait_time,
            start_service_time: customer.start_service_time.as_ref().map(format_timestamp),
            end_service_time: customer.end_service_time.as_ref().map(format_timestamp),
            teller_id: customer.teller_id.clone(),
        }
    }
}

/// Body of `POST /customers/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomerRecord {
    pub name: String,
    pub phone_number: String,
    pub service_type: String,
}

impl From<&NewCustomer> for NewCustomerRecord {
    fn from(customer: &NewCustomer) -> Self {
        Self {
            name: customer.name.clone(),
            phone_number: customer.phone_number.clone(),
            service_type: customer.service_type.as_str().to_string(),
        }
    }
}

/// Body of `PUT /customers/{id}/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRecord {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teller_id: Option<String>,
}

/// Feedback as returned by `GET /feedback/` and `POST /feedback/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub category: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<String>,
}

impl FeedbackRecord {
    pub fn into_feedback(self, offset: FixedOffset) -> Result<Feedback, QueueError> {
        let rating = u8::try_from(self.rating)
            .ok()
            .filter(|rating| (1..=5).contains(rating))
            .ok_or_else(|| {
                QueueError::invalid_input(format!("rating {} out of range", self.rating))
            })?;

        Ok(Feedback {
            category: self.category.parse::<FeedbackCategory>()?,
            created_at: self
                .created_at
                .as_deref()
                .and_then(|text| parse_timestamp(text, offset)),
            id: self.id,
            rating,
            comment: self.comment.unwrap_or_default(),
        })
    }
}

impl From<&Feedback> for FeedbackRecord {
    fn from(feedback: &Feedback) -> Self {
        Self {
            id: feedback.id.clone(),
            category: feedback.category.as_str().to_string(),
            rating: i64::from(feedback.rating),
            comment: Some(feedback.comment.clone()),
            created_at: feedback.created_at.as_ref().map(format_timestamp),
        }
    }
}

/// Body of `POST /feedback/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedbackRecord {
    pub category: String,
    pub rating: u8,
    pub comment: String,
}

impl From<&NewFeedback> for NewFeedbackRecord {
    fn from(feedback: &NewFeedback) -> Self {
        Self {
            category: feedback.category.as_str().to_string(),
            rating: feedback.rating,
            comment: feedback.comment.clone(),
        }
    }
}
