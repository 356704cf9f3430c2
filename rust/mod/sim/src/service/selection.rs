use salesops_core::ServiceError;

use crate::model::SimSummary;
use super::{error::storage_error, store, SimService};

impl SimService {
    /// Cards a picker may offer: every AVAILABLE card of `scope` ordered by
    /// serial, plus the card with `include_serial` whatever its status.
    pub fn select_available(
        &self,
        scope: &str,
        include_serial: Option<&str>,
    ) -> Result<Vec<SimSummary>, ServiceError> {
        let cards = store::pool(self.sql.as_ref(), scope, include_serial).map_err(storage_error)?;
        Ok(cards
            .into_iter()
            .map(|sim| SimSummary {
                current: include_serial == Some(sim.serial.as_str()),
                id: sim.id,
                serial: sim.serial,
                status: sim.status,
                scope: sim.scope,
            })
            .collect())
    }

    /// Picker contents for a client edit form.
    pub fn select_for_client(&self, client_id: &str) -> Result<Vec<SimSummary>, ServiceError> {
        let client = self.get_client(client_id)?;
        self.select_available(&client.scope, client.held_sim_serial.as_deref())
    }
}
