//! Teller roster configuration

use crate::types::{ServiceType, Teller, TellerId, TellerStatus};
use serde::{Deserialize, Serialize};

/// A pre-provisioned teller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TellerSettings {
    pub id: TellerId,
    pub name: String,
    pub service_types: Vec<ServiceType>,
    /// Start the day on break; never dispatched until set available
    #[serde(default)]
    pub on_break: bool,
}

impl TellerSettings {
    pub fn new(id: &str, name: &str, service_types: &[ServiceType]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            service_types: service_types.to_vec(),
            on_break: false,
        }
    }

    /// Build the runtime teller with no history
    pub fn to_teller(&self) -> Teller {
        let mut teller = Teller::new(self.id.clone(), self.name.clone(), self.service_types.clone());
        if self.on_break {
            teller.status = TellerStatus::Break;
        }
        teller
    }
}

/// The branch's standard three-teller roster
pub fn default_roster() -> Vec<TellerSettings> {
    vec![
        TellerSettings::new(
            "1",
            "Jean Bosco",
            &[ServiceType::InternationalTransfer, ServiceType::Forex],
        ),
        TellerSettings::new(
            "2",
            "Marie Claire",
            &[
                ServiceType::InternationalTransfer,
                ServiceType::DomesticTransfer,
            ],
        ),
        TellerSettings::new(
            "3",
            "Emmanuel",
            &[ServiceType::DomesticTransfer, ServiceType::AccountServices],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_service_has_a_teller() {
        let roster = default_roster();
        for service in ServiceType::ALL {
            assert!(
                roster.iter().any(|teller| teller.service_types.contains(&service)),
                "no teller for {}",
                service
            );
        }
    }

    #[test]
    fn test_to_teller() {
        let teller = default_roster()[1].to_teller();
        assert_eq!(teller.name, "Marie Claire");
        assert_eq!(teller.status, TellerStatus::Available);
        assert_eq!(teller.customers_served, 0);
        assert!(teller.current_customer_id.is_none());
    }

    #[test]
    fn test_on_break_teller_starts_on_break() {
        let mut settings = default_roster()[0].clone();
        settings.on_break = true;
        assert_eq!(settings.to_teller().status, TellerStatus::Break);
    }
}
