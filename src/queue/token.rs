//! Per-day token numbering

use crate::clock::Clock;
use crate::types::Customer;
use tracing::warn;

/// Next token for a registration: one past today's highest token, or 1
pub fn next_token_number(customers: &[Customer], clock: &dyn Clock) -> u32 {
    customers
        .iter()
        .filter(|customer| customer.checked_in_today(clock))
        .map(|customer| customer.token_number)
        .max()
        .map_or(1, |max| {
            max.checked_add(1).unwrap_or_else(|| {
                warn!("Token numbering exhausted at {}, reusing the highest token", max);
                max
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::queue::testing::{customer_at, noon};
    use crate::types::{CustomerStatus, ServiceType};
    use chrono::Duration;

    #[test]
    fn test_first_token_of_the_day() {
        let clock = FixedClock::at(noon());
        assert_eq!(next_token_number(&[], &clock), 1);
    }

    #[test]
    fn test_next_token_after_contiguous_tokens() {
        let clock = FixedClock::at(noon());
        let customers: Vec<_> = (1..=5)
            .map(|token| {
                customer_at(
                    token,
                    ServiceType::Forex,
                    CustomerStatus::Waiting,
                    noon() - Duration::minutes(60 - token as i64),
                )
            })
            .collect();
        assert_eq!(next_token_number(&customers, &clock), 6);
    }

    #[test]
    fn test_yesterdays_tokens_do_not_count() {
        let clock = FixedClock::at(noon());
        let customers = vec![
            customer_at(
                41,
                ServiceType::Forex,
                CustomerStatus::Completed,
                noon() - Duration::days(1),
            ),
            customer_at(
                42,
                ServiceType::Forex,
                CustomerStatus::Cancelled,
                noon() - Duration::days(1),
            ),
        ];
        assert_eq!(next_token_number(&customers, &clock), 1);
    }

    #[test]
    fn test_uses_maximum_not_count() {
        let clock = FixedClock::at(noon());
        let customers = vec![
            customer_at(3, ServiceType::Forex, CustomerStatus::Completed, noon()),
            customer_at(7, ServiceType::Forex, CustomerStatus::Waiting, noon()),
        ];
        assert_eq!(next_token_number(&customers, &clock), 8);
    }

    #[test]
    fn test_missing_check_in_is_ignored() {
        let clock = FixedClock::at(noon());
        let mut customer = customer_at(9, ServiceType::Forex, CustomerStatus::Waiting, noon());
        customer.check_in_time = None;
        assert_eq!(next_token_number(&[customer], &clock), 1);
    }

    #[test]
    fn test_highest_possible_token_does_not_overflow() {
        let clock = FixedClock::at(noon());
        let customers = vec![customer_at(
            u32::MAX,
            ServiceType::Forex,
            CustomerStatus::Waiting,
            noon(),
        )];
        assert_eq!(next_token_number(&customers, &clock), u32::MAX);
    }
}
