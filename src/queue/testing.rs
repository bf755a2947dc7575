//! Builders shared by the queue unit tests

use crate::types::{Customer, CustomerStatus, ServiceType, Teller};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// 2025-03-10 12:00 UTC
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub fn customer_at(
    token: u32,
    service_type: ServiceType,
    status: CustomerStatus,
    check_in: DateTime<Utc>,
) -> Customer {
    Customer {
        id: format!("customer-{}", token),
        name: format!("Customer {}", token),
        phone_number: "0712345678".to_string(),
        token_number: token,
        service_type,
        status,
        check_in_time: Some(check_in),
        estimated_wait_time: 0,
        start_service_time: None,
        end_service_time: None,
        teller_id: None,
    }
}

/// Customer checked in at noon, started after `wait` minutes and, if given,
/// finished `service` minutes later
pub fn served(
    token: u32,
    service_type: ServiceType,
    wait: i64,
    service: Option<i64>,
    teller_id: &str,
) -> Customer {
    let start = noon() + Duration::minutes(wait);
    let mut customer = customer_at(token, service_type, CustomerStatus::Serving, noon());
    customer.start_service_time = Some(start);
    customer.teller_id = Some(teller_id.to_string());
    if let Some(service) = service {
        customer.status = CustomerStatus::Completed;
        customer.end_service_time = Some(start + Duration::minutes(service));
    }
    customer
}

pub fn teller(id: &str, service_types: &[ServiceType]) -> Teller {
    Teller::new(id, format!("Teller {}", id), service_types.to_vec())
}
