//! Teller dispatch: strict per-teller FIFO by token number

use crate::clock::Clock;
use crate::types::{Customer, CustomerStatus, Teller};

/// The next customer a teller should call
///
/// Among today's waiting customers whose service the teller is qualified
/// for, the one holding the smallest token.
pub fn next_for_teller<'a>(
    customers: &'a [Customer],
    teller: &Teller,
    clock: &dyn Clock,
) -> Option<&'a Customer> {
    customers
        .iter()
        .filter(|customer| {
            customer.status == CustomerStatus::Waiting
                && teller.handles(customer.service_type)
                && customer.checked_in_today(clock)
        })
        .min_by_key(|customer| customer.token_number)
}

/// Today's customers in a given status, ordered by token
pub fn customers_by_status<'a>(
    customers: &'a [Customer],
    status: CustomerStatus,
    clock: &dyn Clock,
) -> Vec<&'a Customer> {
    let mut matching: Vec<&Customer> = customers
        .iter()
        .filter(|customer| customer.status == status && customer.checked_in_today(clock))
        .collect();
    matching.sort_by_key(|customer| customer.token_number);
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::queue::testing::{customer_at, noon, teller};
    use crate::types::ServiceType;
    use chrono::Duration;

    #[test]
    fn test_lowest_token_wins() {
        let clock = FixedClock::at(noon());
        let customers = vec![
            customer_at(
                2,
                ServiceType::InternationalTransfer,
                CustomerStatus::Waiting,
                noon(),
            ),
            customer_at(
                1,
                ServiceType::InternationalTransfer,
                CustomerStatus::Waiting,
                noon(),
            ),
        ];
        let teller = teller("1", &[ServiceType::InternationalTransfer]);

        let next = next_for_teller(&customers, &teller, &clock).unwrap();
        assert_eq!(next.token_number, 1);
    }

    #[test]
    fn test_token_order_not_check_in_order() {
        let clock = FixedClock::at(noon());
        // Token 5 has an earlier check-in timestamp than token 3
        let customers = vec![
            customer_at(
                5,
                ServiceType::Forex,
                CustomerStatus::Waiting,
                noon() - Duration::minutes(30),
            ),
            customer_at(3, ServiceType::Forex, CustomerStatus::Waiting, noon()),
        ];
        let teller = teller("1", &[ServiceType::Forex]);

        assert_eq!(
            next_for_teller(&customers, &teller, &clock)
                .unwrap()
                .token_number,
            3
        );
    }

    #[test]
    fn test_skips_unqualified_and_non_waiting() {
        let clock = FixedClock::at(noon());
        let customers = vec![
            customer_at(1, ServiceType::AccountServices, CustomerStatus::Waiting, noon()),
            customer_at(2, ServiceType::Forex, CustomerStatus::Serving, noon()),
            customer_at(3, ServiceType::Forex, CustomerStatus::Cancelled, noon()),
            customer_at(4, ServiceType::Forex, CustomerStatus::Waiting, noon()),
        ];
        let teller = teller("1", &[ServiceType::InternationalTransfer, ServiceType::Forex]);

        let next = next_for_teller(&customers, &teller, &clock).unwrap();
        assert_eq!(next.token_number, 4);
    }

    #[test]
    fn test_none_when_nothing_eligible() {
        let clock = FixedClock::at(noon());
        let customers = vec![
            customer_at(1, ServiceType::AccountServices, CustomerStatus::Waiting, noon()),
            customer_at(
                2,
                ServiceType::Forex,
                CustomerStatus::Waiting,
                noon() - Duration::days(1),
            ),
        ];
        let teller = teller("1", &[ServiceType::Forex]);

        assert!(next_for_teller(&customers, &teller, &clock).is_none());
        assert!(next_for_teller(&[], &teller, &clock).is_none());
    }

    #[test]
    fn test_customers_by_status_sorted_and_today_only() {
        let clock = FixedClock::at(noon());
        let customers = vec![
            customer_at(3, ServiceType::Forex, CustomerStatus::Waiting, noon()),
            customer_at(1, ServiceType::Forex, CustomerStatus::Waiting, noon()),
            customer_at(2, ServiceType::Forex, CustomerStatus::Serving, noon()),
            customer_at(
                9,
                ServiceType::Forex,
                CustomerStatus::Waiting,
                noon() - Duration::days(2),
            ),
        ];

        let tokens: Vec<u32> = customers_by_status(&customers, CustomerStatus::Waiting, &clock)
            .iter()
            .map(|customer| customer.token_number)
            .collect();
        assert_eq!(tokens, vec![1, 3]);
    }
}
