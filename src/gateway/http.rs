//! HTTP gateway to the remote queue API

use crate::config::ApiSettings;
use crate::error::{QueueError, Result};
use crate::gateway::wire::{
    CustomerRecord, FeedbackRecord, NewCustomerRecord, NewFeedbackRecord, StatusUpdateRecord,
};
use crate::gateway::QueueGateway;
use crate::types::{Customer, CustomerStatus, Feedback, NewCustomer, NewFeedback, TellerId};
use async_trait::async_trait;
use chrono::FixedOffset;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// REST client for the queue backend
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    offset: FixedOffset,
}

impl HttpGateway {
    /// Create a gateway; naive timestamps from the API are read in `offset`
    pub fn new(settings: &ApiSettings, offset: FixedOffset) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .map_err(|e| QueueError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            offset,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and check the status, logging failures
    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            error!("Failed to {}: {}", what, e);
            QueueError::Transport {
                message: format!("Failed to {}: {}", what, e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Failed to {}: API returned {} {}", what, status, body);
            return Err(QueueError::RemoteStatus {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            error!("Failed to decode response to {}: {}", what, e);
            QueueError::MalformedResponse {
                message: format!("{}: {}", what, e),
            }
            .into()
        })
    }
}

#[async_trait]
impl QueueGateway for HttpGateway {
    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let what = "fetch customers";
        let response = self
            .send(self.client.get(self.url("customers/")), what)
            .await?;
        let records: Vec<CustomerRecord> = Self::decode(response, what).await?;

        let total = records.len();
        let customers: Vec<Customer> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                match record.into_customer(self.offset) {
                    Ok(customer) => Some(customer),
                    Err(e) => {
                        warn!("Skipping customer record {}: {}", id, e);
                        None
                    }
                }
            })
            .collect();

        debug!("Fetched {} customers ({} skipped)", customers.len(), total - customers.len());
        Ok(customers)
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let what = "create customer";
        let body = NewCustomerRecord::from(&customer);
        let response = self
            .send(self.client.post(self.url("customers/")).json(&body), what)
            .await?;
        let record: CustomerRecord = Self::decode(response, what).await?;

        let created = record
            .into_customer(self.offset)
            .map_err(|e| QueueError::MalformedResponse {
                message: format!("{}: {}", what, e),
            })?;

        info!(
            "Remote registered customer {} with token {}",
            created.id, created.token_number
        );
        Ok(created)
    }

    async fn update_customer_status(
        &self,
        customer_id: &str,
        status: CustomerStatus,
        teller_id: Option<TellerId>,
    ) -> Result<()> {
        let what = "update customer status";
        let body = StatusUpdateRecord {
            status: status.as_str().to_string(),
            teller_id,
        };
        self.send(
            self.client
                .put(self.url(&format!("customers/{}/status", customer_id)))
                .json(&body),
            what,
        )
        .await?;

        debug!("Remote status of {} set to {}", customer_id, status);
        Ok(())
    }

    async fn list_feedback(&self) -> Result<Vec<Feedback>> {
        let what = "fetch feedback";
        let response = self
            .send(self.client.get(self.url("feedback/")), what)
            .await?;
        let records: Vec<FeedbackRecord> = Self::decode(response, what).await?;

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                record
                    .into_feedback(self.offset)
                    .map_err(|e| warn!("Skipping feedback record {}: {}", id, e))
                    .ok()
            })
            .collect())
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> Result<Feedback> {
        let what = "create feedback";
        let body = NewFeedbackRecord::from(&feedback);
        let response = self
            .send(self.client.post(self.url("feedback/")).json(&body), what)
            .await?;
        let record: FeedbackRecord = Self::decode(response, what).await?;

        record
            .into_feedback(self.offset)
            .map_err(|e| {
                QueueError::MalformedResponse {
                    message: format!("{}: {}", what, e),
                }
                .into()
            })
    }
}
