use serde::{Deserialize, Serialize};

/// Client — a customer record that may require one SIM card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,

    pub display_name: String,

    /// Product classification code; the product catalog decides whether it
    /// needs a SIM.
    pub product_class: String,

    /// Serial of the SIM the client holds. Mirrors `SimCard.owner_client_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_sim_serial: Option<String>,

    pub scope: String,

    pub created_at: String,

    /// Soft-delete marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl Client {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub display_name: String,
    pub product_class: String,
    pub scope: String,
}
