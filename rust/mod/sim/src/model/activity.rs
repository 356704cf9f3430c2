use serde::Serialize;

/// One line of a client's history feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub client_id: String,
    /// Who triggered the change (user name, or `system:*` for automation).
    pub actor: String,
    pub message: String,
    pub created_at: String,
}
