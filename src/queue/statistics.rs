//! Daily queue statistics
//!
//! All aggregates are restricted to customers who checked in today and are
//! recomputed from the customer list; nothing here is stored independently.

use crate::clock::Clock;
use crate::types::{Customer, CustomerStatus, QueueStats, ServiceType, Teller, TellerId};
use crate::utils::rounded_mean;
use serde::{Deserialize, Serialize};

/// Aggregate today's queue
pub fn compute_stats(customers: &[Customer], clock: &dyn Clock) -> QueueStats {
    let today: Vec<&Customer> = customers
        .iter()
        .filter(|customer| customer.checked_in_today(clock))
        .collect();

    let waiting_customers = today
        .iter()
        .filter(|customer| customer.status == CustomerStatus::Waiting)
        .count();

    let waits: Vec<f64> = today
        .iter()
        .filter(|customer| {
            matches!(
                customer.status,
                CustomerStatus::Serving | CustomerStatus::Completed
            )
        })
        .filter_map(|customer| customer.wait_minutes())
        .collect();

    let services = completed_service_minutes(today.iter().copied());

    QueueStats {
        total_customers: today.len(),
        waiting_customers,
        avg_wait_time: rounded_mean(&waits),
        avg_service_time: rounded_mean(&services),
    }
}

fn completed_service_minutes<'a>(customers: impl Iterator<Item = &'a Customer>) -> Vec<f64> {
    customers
        .filter(|customer| customer.status == CustomerStatus::Completed)
        .filter_map(|customer| customer.service_minutes())
        .collect()
}

/// Completed work for one service type today
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBreakdown {
    pub service_type: ServiceType,
    pub completed: usize,
    pub avg_service_time: i64,
}

/// Per-service breakdown of today's completed customers, one row per type
pub fn service_breakdown(customers: &[Customer], clock: &dyn Clock) -> Vec<ServiceBreakdown> {
    ServiceType::ALL
        .into_iter()
        .map(|service_type| {
            let services = completed_service_minutes(customers.iter().filter(|customer| {
                customer.service_type == service_type && customer.checked_in_today(clock)
            }));
            ServiceBreakdown {
                service_type,
                completed: services.len(),
                avg_service_time: rounded_mean(&services),
            }
        })
        .collect()
}

/// Today's performance of one teller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TellerPerformance {
    pub teller_id: TellerId,
    pub name: String,
    pub completed_today: usize,
    pub avg_service_time: i64,
    pub customers_served: u32,
}

/// Per-teller performance for the roster, in roster order
pub fn teller_performance(
    customers: &[Customer],
    tellers: &[Teller],
    clock: &dyn Clock,
) -> Vec<TellerPerformance> {
    tellers
        .iter()
        .map(|teller| {
            let services = completed_service_minutes(customers.iter().filter(|customer| {
                customer.teller_id.as_deref() == Some(teller.id.as_str())
                    && customer.checked_in_today(clock)
            }));
            TellerPerformance {
                teller_id: teller.id.clone(),
                name: teller.name.clone(),
                completed_today: services.len(),
                avg_service_time: rounded_mean(&services),
                customers_served: teller.customers_served,
            }
        })
        .collect()
}

/// Today's completed customers, most recently finished first
pub fn recently_completed<'a>(
    customers: &'a [Customer],
    clock: &dyn Clock,
    limit: usize,
) -> Vec<&'a Customer> {
    let mut completed: Vec<&Customer> = customers
        .iter()
        .filter(|customer| {
            customer.status == CustomerStatus::Completed
                && customer.end_service_time.is_some()
                && customer.checked_in_today(clock)
        })
        .collect();
    completed.sort_by(|a, b| b.end_service_time.cmp(&a.end_service_time));
    completed.truncate(limit);
    completed
}
