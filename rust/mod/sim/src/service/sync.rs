//! Reaction to a client's product classification changing.
//!
//! The trigger never fails the create/update that fired it: engine errors
//! come back inside [`SyncOutcome`] and the client simply stays as it is.

use serde::Serialize;
use tracing::{info, warn};

use salesops_sql::{with_savepoint, SQLTransaction};

use crate::model::{AssignOutcome, Binding, ProductCatalog};
use super::{live_client, store, AssignError, SimService};

/// What a classification change asks of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncAction {
    None,
    Acquire,
    Release,
}

/// Decide the action for `before → after`. `before` is `None` on create.
pub fn plan(catalog: &ProductCatalog, before: Option<&str>, after: &str) -> SyncAction {
    let had = before.is_some_and(|code| catalog.requires_sim(code));
    let needs = catalog.requires_sim(after);
    match (had, needs) {
        (false, true) => SyncAction::Acquire,
        (true, false) => SyncAction::Release,
        _ => SyncAction::None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub action: SyncAction,
    /// Engine result; absent when no action was needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AssignOutcome>,
}

impl SyncOutcome {
    fn none() -> Self {
        Self { action: SyncAction::None, outcome: None }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().map_or(true, |o| o.success)
    }
}

impl SimService {
    /// Apply the trigger for a classification change made elsewhere.
    pub fn sync_product_change(
        &self,
        actor: &str,
        client_id: &str,
        before: Option<&str>,
        after: &str,
    ) -> SyncOutcome {
        let action = plan(&self.catalog, before, after);
        if action == SyncAction::None {
            return SyncOutcome::none();
        }
        let result = self.in_transaction("sync_product_change", |tx| {
            Ok::<_, AssignError>(self.sync_in_tx(tx, actor, client_id, before, after))
        });
        result.unwrap_or_else(|e| SyncOutcome {
            action,
            outcome: Some(AssignOutcome::failed(&e)),
        })
    }

    /// Run the trigger inside the caller's transaction. The engine step
    /// runs under a savepoint, so a failed acquire or release is undone
    /// without touching the caller's own writes.
    pub(crate) fn sync_in_tx(
        &self,
        tx: &dyn SQLTransaction,
        actor: &str,
        client_id: &str,
        before: Option<&str>,
        after: &str,
    ) -> SyncOutcome {
        let action = plan(&self.catalog, before, after);
        let outcome: AssignOutcome = match action {
            SyncAction::None => return SyncOutcome::none(),
            SyncAction::Acquire => {
                with_savepoint(tx, "sync_step", || self.acquire_in_tx(tx, actor, client_id)).into()
            }
            SyncAction::Release => with_savepoint(tx, "sync_step", || {
                let client = live_client(tx, client_id)?;
                self.release_in_tx(tx, actor, &client, Some("product no longer needs a SIM"))
            })
            .into(),
        };

        if outcome.success {
            info!(client = client_id, ?action, after, "product change synchronized");
        } else {
            warn!(
                client = client_id,
                ?action,
                after,
                code = outcome.code.unwrap_or_default(),
                message = %outcome.message,
                "product change left the client without the expected SIM state"
            );
        }
        SyncOutcome { action, outcome: Some(outcome) }
    }

    /// Bind the lowest-serial AVAILABLE card of the client's scope. A card
    /// the client already owns is kept.
    fn acquire_in_tx(
        &self,
        tx: &dyn SQLTransaction,
        actor: &str,
        client_id: &str,
    ) -> Result<Binding, AssignError> {
        let client = live_client(tx, client_id)?;
        if let Some(owned) = store::load_sim_owned_by(tx, &client.id)? {
            return self.assign_in_tx(tx, actor, owned, client_id);
        }
        let sim = store::first_available(tx, &client.scope)?.ok_or_else(|| {
            AssignError::NotFound(format!("no AVAILABLE SIM in scope {}", client.scope))
        })?;
        self.assign_in_tx(tx, actor, sim, client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimStatus;
    use crate::service::testutil::*;

    #[test]
    fn plan_follows_requirement_change() {
        let cat = catalog();
        assert_eq!(plan(&cat, None, MOBILE), SyncAction::Acquire);
        assert_eq!(plan(&cat, None, FIBER), SyncAction::None);
        assert_eq!(plan(&cat, Some(FIBER), MOBILE), SyncAction::Acquire);
        assert_eq!(plan(&cat, Some(MOBILE), FIBER), SyncAction::Release);
        assert_eq!(plan(&cat, Some(MOBILE), MOBILE_INSTANT), SyncAction::None);
        assert_eq!(plan(&cat, Some("UNKNOWN"), "OTHER"), SyncAction::None);
        assert_eq!(plan(&cat, Some(MOBILE), "UNKNOWN"), SyncAction::Release);
    }

    #[test]
    fn acquire_takes_lowest_serial_of_scope() {
        let svc = service();
        sims(&svc, "V002", &["0001"]);
        sims(&svc, "V001", &["0200", "0100"]);
        let c = client(&svc, "One", "V001");

        let out = svc.sync_product_change("alice", &c.id, Some(FIBER), MOBILE);
        assert_eq!(out.action, SyncAction::Acquire);
        assert!(out.succeeded());
        assert_eq!(out.outcome.unwrap().binding.unwrap().serial, "0100");
        assert_consistent(&svc);
    }

    #[test]
    fn empty_pool_reports_not_found_and_leaves_client_alone() {
        let svc = service();
        sims(&svc, "V002", &["0001"]);
        let c = client(&svc, "One", "V001");

        let out = svc.sync_product_change("alice", &c.id, Some(FIBER), MOBILE);
        assert_eq!(out.action, SyncAction::Acquire);
        let outcome = out.outcome.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some("NOT_FOUND"));
        assert_eq!(svc.get_client(&c.id).unwrap().held_sim_serial, None);
    }

    #[test]
    fn acquire_keeps_card_already_held() {
        let svc = service();
        let cards = sims(&svc, "V001", &["0001", "0002"]);
        let c = client(&svc, "One", "V001");
        svc.assign("alice", &cards[1].id, &c.id).unwrap();

        let out = svc.sync_product_change("alice", &c.id, None, MOBILE);
        assert_eq!(out.outcome.unwrap().binding.unwrap().serial, "0002");
        assert_eq!(svc.get_sim(&cards[0].id).unwrap().status, SimStatus::Available);
    }

    #[test]
    fn release_on_downgrade() {
        let svc = service();
        sims(&svc, "V001", &["0001"]);
        let c = client_on(&svc, "One", "V001", MOBILE);
        assert_eq!(svc.get_client(&c.id).unwrap().held_sim_serial.as_deref(), Some("0001"));

        let out = svc.sync_product_change("alice", &c.id, Some(MOBILE), FIBER);
        assert_eq!(out.action, SyncAction::Release);
        assert!(out.succeeded());
        assert_eq!(svc.get_client(&c.id).unwrap().held_sim_serial, None);
        assert_consistent(&svc);
    }

    #[test]
    fn unchanged_requirement_does_nothing() {
        let svc = service();
        let c = client(&svc, "One", "V001");
        let out = svc.sync_product_change("alice", &c.id, Some(FIBER), "SOMETHING_ELSE");
        assert_eq!(out, SyncOutcome::none());
        assert!(out.succeeded());
    }
}
