//! Read-only audit of the binding invariants between SIM cards and clients.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use salesops_core::ServiceError;

use crate::model::{Client, SimCard};
use super::error::storage_error;
use super::{store, SimService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    /// AVAILABLE with an owner, or any other status without one.
    StatusOwnerMismatch,
    /// Owner column points at a client that does not exist.
    DanglingOwner,
    /// The owner's back-reference names another serial, or none.
    BackReferenceMismatch,
    /// A client references a serial it does not own.
    StrayBackReference,
    /// A soft-deleted client still holds a card.
    DeletedHolder,
    /// Card and owner belong to different scopes.
    ScopeMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyFault {
    pub kind: FaultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub detail: String,
}

impl SimService {
    /// Scan both tables and report every binding invariant that does not
    /// hold. Nothing is repaired here.
    pub fn check_consistency(&self) -> Result<Vec<ConsistencyFault>, ServiceError> {
        // Read both tables from one snapshot.
        let (sims, clients) = self.in_transaction("check_consistency", |tx| {
            let sims = store::all_sims(tx).map_err(storage_error)?;
            let clients = store::all_clients(tx).map_err(storage_error)?;
            Ok::<_, ServiceError>((sims, clients))
        })?;

        let faults = find_faults(&sims, &clients);
        if !faults.is_empty() {
            warn!(count = faults.len(), "binding consistency faults found");
        }
        Ok(faults)
    }
}

fn find_faults(sims: &[SimCard], clients: &[Client]) -> Vec<ConsistencyFault> {
    let by_id: HashMap<&str, &Client> = clients.iter().map(|c| (c.id.as_str(), c)).collect();
    let by_serial: HashMap<&str, &SimCard> = sims.iter().map(|s| (s.serial.as_str(), s)).collect();
    let mut faults = Vec::new();

    let mut fault = |kind, sim: Option<&str>, client: Option<&str>, detail: String| {
        faults.push(ConsistencyFault {
            kind,
            sim_serial: sim.map(String::from),
            client_id: client.map(String::from),
            detail,
        });
    };

    for sim in sims {
        let serial = Some(sim.serial.as_str());
        if !sim.status_matches_owner() {
            fault(
                FaultKind::StatusOwnerMismatch,
                serial,
                sim.owner_client_id.as_deref(),
                format!("status {} with owner {:?}", sim.status, sim.owner_client_id),
            );
        }
        let Some(owner_id) = sim.owner_client_id.as_deref() else {
            continue;
        };
        let Some(owner) = by_id.get(owner_id) else {
            fault(FaultKind::DanglingOwner, serial, Some(owner_id), "owner does not exist".into());
            continue;
        };
        if owner.held_sim_serial.as_deref() != serial {
            fault(
                FaultKind::BackReferenceMismatch,
                serial,
                Some(owner_id),
                format!("owner holds {:?}", owner.held_sim_serial),
            );
        }
        if owner.scope != sim.scope {
            fault(
                FaultKind::ScopeMismatch,
                serial,
                Some(owner_id),
                format!("card scope {}, client scope {}", sim.scope, owner.scope),
            );
        }
    }

    for client in clients {
        let id = Some(client.id.as_str());
        if let Some(held) = client.held_sim_serial.as_deref() {
            let owner = by_serial.get(held).and_then(|s| s.owner_client_id.as_deref());
            if owner != id {
                fault(
                    FaultKind::StrayBackReference,
                    Some(held),
                    id,
                    format!("card owner is {owner:?}"),
                );
            }
        }
        let owns_any = sims.iter().any(|s| s.owner_client_id.as_deref() == id);
        if client.is_deleted() && (owns_any || client.held_sim_serial.is_some()) {
            fault(
                FaultKind::DeletedHolder,
                client.held_sim_serial.as_deref(),
                id,
                "deleted client still bound".into(),
            );
        }
    }

    faults
}
