//! The assignment engine: assign, release, reassign and change.
//!
//! Each public operation is one transaction covering the SIM row, the
//! client row and the activity feed. Preconditions are re-read inside the
//! transaction and every binding write is a compare-and-set, so a caller
//! that loses a race gets `InvalidState` and leaves nothing behind.

use tracing::{error, info, warn};

use salesops_core::now_rfc3339;
use salesops_sql::SQLTransaction;

use crate::model::{Binding, Client, SimCard, SimStatus};
use super::{live_client, store, AssignError, SimService};

impl SimService {
    /// Bind an AVAILABLE card to a client, releasing whatever card the
    /// client held before.
    pub fn assign(&self, actor: &str, sim_id: &str, client_id: &str) -> Result<Binding, AssignError> {
        self.in_transaction("assign", |tx| {
            let sim = find_sim(tx, sim_id)?;
            self.assign_in_tx(tx, actor, sim, client_id)
        })
    }

    /// Unbind the client's card and return it to the pool.
    ///
    /// Succeeds without writing anything when the client holds no card.
    /// A soft-deleted client is `NotFound`.
    pub fn release(&self, actor: &str, client_id: &str) -> Result<Option<Binding>, AssignError> {
        self.in_transaction("release", |tx| {
            let client = live_client(tx, client_id)?;
            self.release_in_tx(tx, actor, &client, None)
        })
    }

    /// Move a card from its current owner (if any) to another client.
    pub fn reassign(
        &self,
        actor: &str,
        sim_id: &str,
        new_client_id: &str,
    ) -> Result<Binding, AssignError> {
        self.in_transaction("reassign", |tx| {
            let sim = find_sim(tx, sim_id)?;
            let target = live_client(tx, new_client_id)?;
            check_row(&sim)?;

            if sim.owner_client_id.as_deref() == Some(target.id.as_str()) {
                return self.assign_in_tx(tx, actor, sim, new_client_id);
            }
            if sim.status == SimStatus::Terminated {
                return Err(terminated(&sim));
            }
            check_scope(&sim, &target)?;

            if let Some(owner_id) = sim.owner_client_id.as_deref() {
                let note = format!("reassigned to {}", target.display_name);
                match store::load_client(tx, owner_id)? {
                    Some(owner) => {
                        if owner.is_deleted() {
                            warn!(serial = %sim.serial, owner = owner_id, "SIM still owned by a deleted client");
                        }
                        self.release_in_tx(tx, actor, &owner, Some(&note))?;
                    }
                    None => {
                        error!(
                            serial = %sim.serial,
                            owner = owner_id,
                            "consistency fault: SIM owned by a missing client, returning it to the pool"
                        );
                        if store::unbind_sim(tx, &sim.id, Some(owner_id))? == 0 {
                            return Err(changed_concurrently(&sim));
                        }
                    }
                }
            }

            let sim = find_sim(tx, sim_id)?;
            self.assign_in_tx(tx, actor, sim, new_client_id)
        })
    }

    /// Swap the client's card for the card with `new_serial`.
    pub fn change_client_sim(
        &self,
        actor: &str,
        client_id: &str,
        new_serial: &str,
    ) -> Result<Binding, AssignError> {
        self.in_transaction("change_client_sim", |tx| {
            let sim = store::load_sim_by_serial(tx, new_serial)?
                .ok_or_else(|| AssignError::NotFound(format!("SIM {new_serial} not found")))?;
            // The current card is released inside assign_in_tx once the
            // target has passed its checks.
            self.assign_in_tx(tx, actor, sim, client_id)
        })
    }

    // ── In-transaction building blocks ──

    pub(crate) fn assign_in_tx(
        &self,
        tx: &dyn SQLTransaction,
        actor: &str,
        sim: SimCard,
        client_id: &str,
    ) -> Result<Binding, AssignError> {
        let client = live_client(tx, client_id)?;
        check_row(&sim)?;

        if sim.owner_client_id.as_deref() == Some(client.id.as_str()) {
            if sim.status == SimStatus::Terminated {
                return Err(terminated(&sim));
            }
            let held = client.held_sim_serial.as_deref();
            if held != Some(sim.serial.as_str()) {
                error!(
                    client = %client.id,
                    owned = %sim.serial,
                    held = ?held,
                    "consistency fault: restoring back-reference to the owned SIM"
                );
                if let Some(stray) = held {
                    self.repair_stray_reference(tx, stray)?;
                }
                store::set_held_serial(tx, &client.id, Some(&sim.serial))?;
            }
            return Ok(binding(&sim, &client));
        }
        if sim.status != SimStatus::Available {
            return Err(AssignError::InvalidState(format!(
                "SIM {} is {}, not AVAILABLE",
                sim.serial, sim.status
            )));
        }
        check_scope(&sim, &client)?;

        let note = format!("replaced by {}", sim.serial);
        self.release_in_tx(tx, actor, &client, Some(&note))?;

        let rule = self.catalog.rule(&client.product_class);
        let status = if rule.activate_on_assign {
            SimStatus::Active
        } else {
            SimStatus::Assigned
        };
        let now = now_rfc3339();
        let activated_at = rule.activate_on_assign.then_some(now.as_str());

        if store::bind_sim(tx, &sim.id, &client.id, status, &now, activated_at)? == 0 {
            return Err(AssignError::InvalidState(format!(
                "SIM {} was claimed by another request",
                sim.serial
            )));
        }
        if store::set_held_serial(tx, &client.id, Some(&sim.serial))? == 0 {
            return Err(AssignError::NotFound(format!("client {} not found", client.id)));
        }
        store::insert_activity(
            tx,
            &client.id,
            actor,
            &format!("SIM {} assigned ({})", sim.serial, status),
        )?;

        info!(serial = %sim.serial, client = %client.id, %status, actor, "SIM assigned");
        Ok(binding(&sim, &client))
    }

    /// Release the client's card. The owner column is authoritative; a
    /// back-reference that disagrees with it is repaired on the way.
    pub(crate) fn release_in_tx(
        &self,
        tx: &dyn SQLTransaction,
        actor: &str,
        client: &Client,
        note: Option<&str>,
    ) -> Result<Option<Binding>, AssignError> {
        let owned = store::load_sim_owned_by(tx, &client.id)?;
        let held = client.held_sim_serial.as_deref();

        let Some(sim) = owned else {
            let Some(stray) = held else {
                return Ok(None);
            };
            error!(
                client = %client.id,
                held = stray,
                "consistency fault: client references a SIM it does not own"
            );
            self.repair_stray_reference(tx, stray)?;
            store::set_held_serial(tx, &client.id, None)?;
            store::insert_activity(
                tx,
                &client.id,
                actor,
                &format!("Cleared stale SIM reference {stray}"),
            )?;
            return Ok(None);
        };

        if sim.status == SimStatus::Terminated {
            return Err(terminated(&sim));
        }
        if held != Some(sim.serial.as_str()) {
            error!(
                client = %client.id,
                owned = %sim.serial,
                held = ?held,
                "consistency fault: client back-reference disagrees with SIM owner"
            );
            if let Some(stray) = held {
                self.repair_stray_reference(tx, stray)?;
            }
        }

        if store::unbind_sim(tx, &sim.id, Some(&client.id))? == 0 {
            return Err(changed_concurrently(&sim));
        }
        store::set_held_serial(tx, &client.id, None)?;
        let message = match note {
            Some(note) => format!("SIM {} released: {}", sim.serial, note),
            None => format!("SIM {} released", sim.serial),
        };
        store::insert_activity(tx, &client.id, actor, &message)?;

        info!(serial = %sim.serial, client = %client.id, actor, "SIM released");
        Ok(Some(binding(&sim, client)))
    }

    /// A client pointed at `serial` without owning it. Put the card back in
    /// the pool unless a live client owns it.
    fn repair_stray_reference(&self, tx: &dyn SQLTransaction, serial: &str) -> Result<(), AssignError> {
        let Some(sim) = store::load_sim_by_serial(tx, serial)? else {
            return Ok(());
        };
        if sim.status == SimStatus::Terminated {
            return Ok(());
        }

        let live_owner = match sim.owner_client_id.as_deref() {
            Some(owner_id) => store::load_client(tx, owner_id)?.filter(|c| !c.is_deleted()),
            None => None,
        };
        if live_owner.is_some() {
            return Ok(());
        }
        if sim.owner_client_id.is_none() && sim.status == SimStatus::Available {
            return Ok(());
        }

        warn!(serial = %sim.serial, status = %sim.status, "returning orphaned SIM to the pool");
        if let Some(owner_id) = sim.owner_client_id.as_deref() {
            if let Some(owner) = store::load_client(tx, owner_id)? {
                if owner.held_sim_serial.as_deref() == Some(sim.serial.as_str()) {
                    store::set_held_serial(tx, owner_id, None)?;
                }
            }
        }
        if store::unbind_sim(tx, &sim.id, sim.owner_client_id.as_deref())? == 0 {
            return Err(changed_concurrently(&sim));
        }
        Ok(())
    }
}

pub(crate) fn find_sim(tx: &dyn SQLTransaction, sim_id: &str) -> Result<SimCard, AssignError> {
    store::load_sim(tx, sim_id)?
        .ok_or_else(|| AssignError::NotFound(format!("SIM card {sim_id} not found")))
}

fn binding(sim: &SimCard, client: &Client) -> Binding {
    Binding {
        serial: sim.serial.clone(),
        client_id: client.id.clone(),
        client_display_name: client.display_name.clone(),
    }
}

/// Reject a card whose status contradicts its owner column.
fn check_row(sim: &SimCard) -> Result<(), AssignError> {
    if sim.status_matches_owner() {
        return Ok(());
    }
    error!(
        serial = %sim.serial,
        status = %sim.status,
        owner = ?sim.owner_client_id,
        "consistency fault: SIM status disagrees with its owner"
    );
    Err(AssignError::ConsistencyFault(format!(
        "SIM {} is {} but owner is {}",
        sim.serial,
        sim.status,
        sim.owner_client_id.as_deref().unwrap_or("empty")
    )))
}

fn check_scope(sim: &SimCard, client: &Client) -> Result<(), AssignError> {
    if sim.scope == client.scope {
        return Ok(());
    }
    Err(AssignError::ScopeMismatch(format!(
        "SIM {} belongs to scope {}, client {} to scope {}",
        sim.serial, sim.scope, client.display_name, client.scope
    )))
}

fn terminated(sim: &SimCard) -> AssignError {
    AssignError::InvalidState(format!("SIM {} is TERMINATED", sim.serial))
}

fn changed_concurrently(sim: &SimCard) -> AssignError {
    AssignError::InvalidState(format!("SIM {} was changed by another request", sim.serial))
}
