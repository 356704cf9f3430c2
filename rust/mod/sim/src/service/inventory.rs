use std::collections::HashSet;

use tracing::info;

use salesops_core::{new_id, now_rfc3339, ServiceError};

use crate::model::{SimCard, SimStatus};
use super::error::storage_error;
use super::{store, SimService};

impl SimService {
    /// Add a batch of AVAILABLE cards to a scope. All or nothing: one
    /// duplicate serial rejects the whole batch.
    pub fn provision_sims(&self, scope: &str, serials: Vec<String>) -> Result<Vec<SimCard>, ServiceError> {
        let scope = scope.trim();
        if scope.is_empty() {
            return Err(ServiceError::Validation("scope is required".into()));
        }
        if serials.is_empty() {
            return Err(ServiceError::Validation("at least one serial is required".into()));
        }

        let mut seen = HashSet::new();
        let mut cards = Vec::with_capacity(serials.len());
        let created_at = now_rfc3339();
        for serial in serials {
            let serial = serial.trim().to_string();
            if serial.is_empty() {
                return Err(ServiceError::Validation("serial must not be empty".into()));
            }
            if !seen.insert(serial.clone()) {
                return Err(ServiceError::Validation(format!("serial {serial} listed twice")));
            }
            cards.push(SimCard {
                id: new_id(),
                serial,
                status: SimStatus::Available,
                owner_client_id: None,
                scope: scope.to_string(),
                assigned_at: None,
                activated_at: None,
                created_at: created_at.clone(),
            });
        }

        self.in_transaction("provision_sims", |tx| {
            for card in &cards {
                store::insert_sim(tx, card).map_err(|e| {
                    if e.is_unique_violation() {
                        ServiceError::Conflict(format!("SIM {} already exists", card.serial))
                    } else {
                        storage_error(e)
                    }
                })?;
            }
            Ok::<_, ServiceError>(())
        })?;

        info!(scope, count = cards.len(), "SIM cards provisioned");
        Ok(cards)
    }

    pub fn get_sim(&self, sim_id: &str) -> Result<SimCard, ServiceError> {
        store::load_sim(self.sql.as_ref(), sim_id)
            .map_err(storage_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("SIM card {sim_id} not found")))
    }

    pub fn get_sim_by_serial(&self, serial: &str) -> Result<SimCard, ServiceError> {
        store::load_sim_by_serial(self.sql.as_ref(), serial)
            .map_err(storage_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("SIM {serial} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::*;

    #[test]
    fn provisioned_cards_are_available() {
        let svc = service();
        let cards = sims(&svc, "V001", &["8901", " 8902 "]);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].serial, "8902");

        let loaded = svc.get_sim_by_serial("8902").unwrap();
        assert_eq!(loaded, cards[1]);
        assert_eq!(loaded.status, SimStatus::Available);
        assert_eq!(loaded.owner_client_id, None);
        assert_eq!(svc.get_sim(&cards[0].id).unwrap().serial, "8901");
    }

    #[test]
    fn duplicate_serial_rejects_whole_batch() {
        let svc = service();
        sims(&svc, "V001", &["0001"]);

        let err = svc
            .provision_sims("V001", vec!["0002".into(), "0001".into()])
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(svc.get_sim_by_serial("0002").is_err());

        let err = svc
            .provision_sims("V001", vec!["0003".into(), "0003".into()])
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn rejects_empty_input() {
        let svc = service();
        assert!(matches!(svc.provision_sims("", vec!["1".into()]), Err(ServiceError::Validation(_))));
        assert!(matches!(svc.provision_sims("V001", vec![]), Err(ServiceError::Validation(_))));
        assert!(matches!(svc.get_sim("missing"), Err(ServiceError::NotFound(_))));
    }
}
