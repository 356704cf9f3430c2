pub mod assignment;
pub mod client;
pub mod consistency;
pub mod error;
pub mod inventory;
pub mod schema;
pub mod selection;
pub(crate) mod store;
pub mod sync;

use std::sync::Arc;

use tracing::debug;

use salesops_core::ServiceError;
use salesops_sql::{SQLStore, SQLTransaction};

use crate::model::{Client, ProductCatalog};

pub use error::AssignError;

/// Actor recorded for changes made by the synchronization trigger.
pub const SYSTEM_SYNC_ACTOR: &str = "system:sync";

/// SIM service — owns the SQL handle and the product catalog, and is the
/// only code path that writes the binding columns.
pub struct SimService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) catalog: ProductCatalog,
}

impl SimService {
    pub fn new(sql: Arc<dyn SQLStore>, catalog: ProductCatalog) -> Result<Self, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Self { sql, catalog })
    }

    /// Run `f` inside one write transaction; commit on `Ok`, roll back on `Err`.
    pub(crate) fn in_transaction<T, E>(
        &self,
        op: &str,
        f: impl FnOnce(&dyn SQLTransaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<AssignError>,
    {
        let tx = self.sql.begin().map_err(|e| E::from(AssignError::from(e)))?;
        match f(tx.as_ref()) {
            Ok(value) => {
                tx.commit().map_err(|e| E::from(AssignError::from(e)))?;
                Ok(value)
            }
            Err(e) => {
                debug!(op, "rolling back");
                drop(tx);
                Err(e)
            }
        }
    }
}

/// Load a client that engine operations may act on: present and not
/// soft-deleted.
pub(crate) fn live_client(tx: &dyn SQLTransaction, client_id: &str) -> Result<Client, AssignError> {
    match store::load_client(tx, client_id)? {
        Some(c) if c.is_deleted() => Err(AssignError::NotFound(format!(
            "client {client_id} is deleted"
        ))),
        Some(c) => Ok(c),
        None => Err(AssignError::NotFound(format!("client {client_id} not found"))),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use salesops_sql::SqliteStore;

    use super::*;
    use crate::model::{NewClient, ProductRule, SimCard};

    pub const MOBILE: &str = "MOBILE";
    pub const MOBILE_INSTANT: &str = "MOBILE_INSTANT";
    pub const FIBER: &str = "FIBER";

    pub fn catalog() -> ProductCatalog {
        ProductCatalog::default()
            .with(MOBILE, ProductRule { requires_sim: true, activate_on_assign: false })
            .with(MOBILE_INSTANT, ProductRule { requires_sim: true, activate_on_assign: true })
            .with(FIBER, ProductRule { requires_sim: false, activate_on_assign: false })
    }

    pub fn service() -> SimService {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        SimService::new(db, catalog()).unwrap()
    }

    pub fn sims(svc: &SimService, scope: &str, serials: &[&str]) -> Vec<SimCard> {
        svc.provision_sims(scope, serials.iter().map(|s| s.to_string()).collect())
            .unwrap()
    }

    /// A client created on a product that needs no SIM, so the trigger
    /// leaves it alone.
    pub fn client(svc: &SimService, name: &str, scope: &str) -> Client {
        client_on(svc, name, scope, FIBER)
    }

    pub fn client_on(svc: &SimService, name: &str, scope: &str, product: &str) -> Client {
        svc.create_client(
            "tester",
            NewClient {
                display_name: name.into(),
                product_class: product.into(),
                scope: scope.into(),
            },
        )
        .unwrap()
        .client
    }

    pub fn assert_consistent(svc: &SimService) {
        let faults = svc.check_consistency().unwrap();
        assert!(faults.is_empty(), "consistency faults: {faults:?}");
    }
}
