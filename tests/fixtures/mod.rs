//! Test fixtures shared by the integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use teller_queue::clock::{Clock, FixedClock};
use teller_queue::config::{default_roster, AppConfig};
use teller_queue::gateway::{InMemoryGateway, QueueGateway};
use teller_queue::service::AppState;
use teller_queue::store::QueueStore;
use teller_queue::types::{Customer, CustomerStatus, ServiceType};

/// 2025-03-10 12:00 UTC
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

/// Waiting customer checked in `minutes_ago` before noon
pub fn waiting(token: u32, service_type: ServiceType, minutes_ago: i64) -> Customer {
    Customer {
        id: format!("customer-{}", token),
        name: format!("Customer {}", token),
        phone_number: "0788000000".to_string(),
        token_number: token,
        service_type,
        status: CustomerStatus::Waiting,
        check_in_time: Some(noon() - Duration::minutes(minutes_ago)),
        estimated_wait_time: 15,
        start_service_time: None,
        end_service_time: None,
        teller_id: None,
    }
}

/// Customer from the previous day
pub fn yesterday(token: u32, service_type: ServiceType) -> Customer {
    let mut customer = waiting(token, service_type, 0);
    customer.id = format!("yesterday-{}", token);
    customer.check_in_time = Some(noon() - Duration::days(1));
    customer
}

/// Completed customer: waited `wait` minutes, served for `service` minutes
pub fn completed(
    token: u32,
    service_type: ServiceType,
    teller_id: &str,
    wait: i64,
    service: i64,
) -> Customer {
    let mut customer = waiting(token, service_type, wait + service);
    let start = customer.check_in_time.map(|t| t + Duration::minutes(wait));
    customer.status = CustomerStatus::Completed;
    customer.start_service_time = start;
    customer.end_service_time = start.map(|t| t + Duration::minutes(service));
    customer.teller_id = Some(teller_id.to_string());
    customer
}

pub fn test_config() -> AppConfig {
    AppConfig {
        roster: default_roster(),
        ..AppConfig::default()
    }
}

pub struct TestBranch {
    pub clock: Arc<FixedClock>,
    pub gateway: Arc<InMemoryGateway>,
    pub app: AppState,
}

/// Service over an in-memory backend holding `customers`, already refreshed
pub async fn branch_with(customers: Vec<Customer>) -> TestBranch {
    branch_with_config(test_config(), customers).await
}

pub async fn branch_with_config(config: AppConfig, customers: Vec<Customer>) -> TestBranch {
    let clock = Arc::new(FixedClock::at(noon()));
    let gateway = Arc::new(InMemoryGateway::with_customers(clock.clone(), customers));
    let app = AppState::new(
        config,
        gateway.clone() as Arc<dyn QueueGateway>,
        clock.clone() as Arc<dyn Clock>,
    )
    .unwrap();
    app.refresh().await.unwrap();

    TestBranch {
        clock,
        gateway,
        app,
    }
}

/// Bare store over an in-memory backend, not yet refreshed
pub fn store_with(customers: Vec<Customer>) -> (QueueStore, Arc<InMemoryGateway>) {
    let clock = Arc::new(FixedClock::at(noon()));
    let gateway = Arc::new(InMemoryGateway::with_customers(clock.clone(), customers));
    let store = QueueStore::from_config(&test_config(), gateway.clone(), clock).unwrap();
    (store, gateway)
}
