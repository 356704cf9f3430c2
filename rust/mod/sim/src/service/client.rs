use serde::Serialize;
use tracing::info;

use salesops_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use salesops_sql::SQLTransaction;

use crate::model::{ActivityEntry, Binding, Client, NewClient};
use super::error::storage_error;
use super::sync::SyncOutcome;
use super::{live_client, store, SimService, SYSTEM_SYNC_ACTOR};

const MAX_ACTIVITY_PAGE: usize = 200;

/// A saved client together with what the synchronization trigger did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSaved {
    pub client: Client,
    pub sync: SyncOutcome,
}

impl SimService {
    pub fn create_client(&self, actor: &str, input: NewClient) -> Result<ClientSaved, ServiceError> {
        required("displayName", &input.display_name)?;
        required("productClass", &input.product_class)?;
        required("scope", &input.scope)?;

        let client = Client {
            id: new_id(),
            display_name: input.display_name.trim().to_string(),
            product_class: input.product_class.trim().to_string(),
            held_sim_serial: None,
            scope: input.scope.trim().to_string(),
            created_at: now_rfc3339(),
            deleted_at: None,
        };
        let (client, sync) = self.in_transaction("create_client", |tx| -> Result<_, ServiceError> {
            store::insert_client(tx, &client).map_err(storage_error)?;
            info!(client = %client.id, product = %client.product_class, actor, "client created");

            let sync = self.sync_in_tx(tx, SYSTEM_SYNC_ACTOR, &client.id, None, &client.product_class);
            Ok((reload(tx, &client.id)?, sync))
        })?;
        Ok(ClientSaved { client, sync })
    }

    /// Change a client's product classification and let the trigger bind or
    /// release a SIM accordingly. The write and the trigger share one
    /// transaction; a concurrent change of the same client yields `Conflict`.
    pub fn update_client_product(
        &self,
        actor: &str,
        client_id: &str,
        product_class: &str,
    ) -> Result<ClientSaved, ServiceError> {
        required("productClass", product_class)?;
        let product_class = product_class.trim();

        let (client, sync) = self.in_transaction("update_client_product", |tx| -> Result<_, ServiceError> {
            let before = live_client(tx, client_id)?;
            let changed = store::set_product_class(tx, client_id, &before.product_class, product_class)
                .map_err(storage_error)?;
            if changed == 0 {
                return Err(ServiceError::Conflict(format!(
                    "client {client_id} was changed concurrently"
                )));
            }
            info!(
                client = client_id,
                from = %before.product_class,
                to = product_class,
                actor,
                "product class changed"
            );

            let sync = self.sync_in_tx(
                tx,
                SYSTEM_SYNC_ACTOR,
                client_id,
                Some(&before.product_class),
                product_class,
            );
            Ok((reload(tx, client_id)?, sync))
        })?;
        Ok(ClientSaved { client, sync })
    }

    /// Soft-delete a client, releasing its SIM in the same transaction.
    /// Returns the card that was released, if any.
    pub fn delete_client(&self, actor: &str, client_id: &str) -> Result<Option<Binding>, ServiceError> {
        self.in_transaction("delete_client", |tx| {
            let client = store::load_client(tx, client_id)
                .map_err(storage_error)?
                .filter(|c| !c.is_deleted())
                .ok_or_else(|| ServiceError::NotFound(format!("client {client_id} not found")))?;

            let released = self.release_in_tx(tx, actor, &client, Some("client deleted"))?;
            store::mark_client_deleted(tx, client_id, &now_rfc3339()).map_err(storage_error)?;
            store::insert_activity(tx, client_id, actor, "Client deleted").map_err(storage_error)?;

            info!(client = client_id, actor, "client deleted");
            Ok(released)
        })
    }

    /// Soft-deleted clients are still returned, with `deletedAt` set.
    pub fn get_client(&self, client_id: &str) -> Result<Client, ServiceError> {
        store::load_client(self.sql.as_ref(), client_id)
            .map_err(storage_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("client {client_id} not found")))
    }

    /// The client's history feed, newest first.
    pub fn list_activity(
        &self,
        client_id: &str,
        params: &ListParams,
    ) -> Result<ListResult<ActivityEntry>, ServiceError> {
        self.get_client(client_id)?;
        let db = self.sql.as_ref();
        let total = store::count_activity(db, client_id).map_err(storage_error)?;
        let items = store::list_activity(db, client_id, params.capped_limit(MAX_ACTIVITY_PAGE), params.offset)
            .map_err(storage_error)?;
        Ok(ListResult { items, total })
    }
}

fn reload(tx: &dyn SQLTransaction, client_id: &str) -> Result<Client, ServiceError> {
    store::load_client(tx, client_id)
        .map_err(storage_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("client {client_id} not found")))
}

fn required(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimStatus;
    use crate::service::sync::SyncAction;
    use crate::service::testutil::*;

    fn new_client(name: &str, product: &str, scope: &str) -> NewClient {
        NewClient {
            display_name: name.into(),
            product_class: product.into(),
            scope: scope.into(),
        }
    }

    #[test]
    fn create_on_sim_product_acquires_card() {
        let svc = service();
        sims(&svc, "V001", &["0002", "0001"]);

        let saved = svc.create_client("alice", new_client("Acme", MOBILE, "V001")).unwrap();
        assert_eq!(saved.sync.action, SyncAction::Acquire);
        assert!(saved.sync.succeeded());
        assert_eq!(saved.client.held_sim_serial.as_deref(), Some("0001"));

        let feed = svc.list_activity(&saved.client.id, &ListParams::default()).unwrap();
        assert_eq!(feed.total, 1);
        assert_eq!(feed.items[0].actor, SYSTEM_SYNC_ACTOR);
        assert_consistent(&svc);
    }

    #[test]
    fn create_succeeds_with_empty_pool() {
        let svc = service();
        let saved = svc.create_client("alice", new_client("Acme", MOBILE, "V001")).unwrap();
        assert!(!saved.sync.succeeded());
        assert_eq!(saved.sync.outcome.as_ref().unwrap().code, Some("NOT_FOUND"));
        assert_eq!(saved.client.held_sim_serial, None);
        assert!(svc.get_client(&saved.client.id).is_ok());
    }

    #[test]
    fn create_validates_input() {
        let svc = service();
        let err = svc.create_client("alice", new_client("  ", MOBILE, "V001")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = svc.create_client("alice", new_client("Acme", MOBILE, "")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn product_upgrade_with_empty_pool_still_updates() {
        let svc = service();
        let c = client(&svc, "Acme", "V001");

        let saved = svc.update_client_product("alice", &c.id, MOBILE).unwrap();
        assert_eq!(saved.client.product_class, MOBILE);
        assert_eq!(saved.client.held_sim_serial, None);
        assert_eq!(saved.sync.action, SyncAction::Acquire);
        assert!(!saved.sync.succeeded());
    }

    #[test]
    fn product_round_trip_binds_then_releases() {
        let svc = service();
        let card = sims(&svc, "V001", &["0001"]).remove(0);
        let c = client(&svc, "Acme", "V001");

        let saved = svc.update_client_product("alice", &c.id, MOBILE).unwrap();
        assert_eq!(saved.client.held_sim_serial.as_deref(), Some("0001"));

        let saved = svc.update_client_product("alice", &c.id, FIBER).unwrap();
        assert_eq!(saved.sync.action, SyncAction::Release);
        assert_eq!(saved.client.held_sim_serial, None);
        assert_eq!(svc.get_sim(&card.id).unwrap().status, SimStatus::Available);
        assert_consistent(&svc);
    }

    #[test]
    fn product_write_requires_the_class_it_was_read_with() {
        let svc = service();
        let c = client(&svc, "Acme", "V001");

        let stale = store::set_product_class(svc.sql.as_ref(), &c.id, MOBILE, MOBILE_INSTANT).unwrap();
        assert_eq!(stale, 0);
        assert_eq!(svc.get_client(&c.id).unwrap().product_class, FIBER);

        let fresh = store::set_product_class(svc.sql.as_ref(), &c.id, FIBER, MOBILE).unwrap();
        assert_eq!(fresh, 1);
    }

    #[test]
    fn delete_releases_card() {
        let svc = service();
        let card = sims(&svc, "V001", &["0001"]).remove(0);
        let c = client_on(&svc, "Acme", "V001", MOBILE);

        let released = svc.delete_client("alice", &c.id).unwrap().unwrap();
        assert_eq!(released.serial, "0001");

        let c = svc.get_client(&c.id).unwrap();
        assert!(c.is_deleted());
        assert_eq!(c.held_sim_serial, None);
        assert_eq!(svc.get_sim(&card.id).unwrap().status, SimStatus::Available);
        assert_consistent(&svc);

        assert!(matches!(svc.delete_client("alice", &c.id), Err(ServiceError::NotFound(_))));
        assert!(matches!(
            svc.update_client_product("alice", &c.id, FIBER),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn delete_blocked_by_terminated_card_changes_nothing() {
        use salesops_sql::{Executor, Value};

        let svc = service();
        let card = sims(&svc, "V001", &["0001"]).remove(0);
        let c = client_on(&svc, "Acme", "V001", MOBILE);
        svc.sql
            .exec(
                "UPDATE sim_cards SET status = 'TERMINATED' WHERE id = ?1",
                &[Value::from(card.id.as_str())],
            )
            .unwrap();

        let err = svc.delete_client("alice", &c.id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(!svc.get_client(&c.id).unwrap().is_deleted());
    }

    #[test]
    fn activity_pages_newest_first() {
        let svc = service();
        let cards = sims(&svc, "V001", &["A", "B", "C"]);
        let c = client(&svc, "Acme", "V001");
        for card in &cards {
            svc.assign("alice", &card.id, &c.id).unwrap();
        }

        let all = svc.list_activity(&c.id, &ListParams::default()).unwrap();
        // Three assignments and two releases in between.
        assert_eq!(all.total, 5);
        assert!(all.items[0].message.contains("SIM C assigned"));

        let page = svc.list_activity(&c.id, &ListParams { limit: 2, offset: 1 }).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, all.items[1].id);

        assert!(svc.list_activity("nobody", &ListParams::default()).is_err());
    }
}
