use serde::{Deserialize, Serialize};

/// Lifecycle state of a SIM card.
///
/// ```text
/// AVAILABLE → ASSIGNED ─┐
///           → ACTIVE  ──┴→ AVAILABLE (release)
/// ```
///
/// A card is AVAILABLE exactly when it has no owner, so a TERMINATED card
/// keeps the client it was retired with. The engine never binds or
/// releases TERMINATED cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimStatus {
    Available,
    Assigned,
    Active,
    Terminated,
}

impl SimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Assigned => "ASSIGNED",
            Self::Active => "ACTIVE",
            Self::Terminated => "TERMINATED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(Self::Available),
            "ASSIGNED" => Some(Self::Assigned),
            "ACTIVE" => Some(Self::Active),
            "TERMINATED" => Some(Self::Terminated),
            _ => None,
        }
    }
}

impl std::fmt::Display for SimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SimCard — one physical SIM in the inventory pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimCard {
    pub id: String,

    /// Human-visible serial (ICCID or vendor number). Unique, immutable.
    pub serial: String,

    pub status: SimStatus,

    /// Client currently holding the card. Always `None` while AVAILABLE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_client_id: Option<String>,

    /// Issuing-vendor code; only clients of the same scope may claim the card.
    pub scope: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,

    pub created_at: String,
}

impl SimCard {
    /// AVAILABLE exactly when unowned.
    pub fn status_matches_owner(&self) -> bool {
        (self.status == SimStatus::Available) == self.owner_client_id.is_none()
    }
}

/// One entry of a SIM picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimSummary {
    pub id: String,
    pub serial: String,
    pub status: SimStatus,
    pub scope: String,

    /// True for the card the edited client already holds; the picker shows
    /// it pre-selected.
    pub current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_str_roundtrip() {
        for s in [
            SimStatus::Available,
            SimStatus::Assigned,
            SimStatus::Active,
            SimStatus::Terminated,
        ] {
            assert_eq!(SimStatus::from_str(s.as_str()), Some(s));
            assert_eq!(serde_json::to_value(s).unwrap(), serde_json::json!(s.as_str()));
        }
        assert_eq!(SimStatus::from_str("available"), None);
    }

    #[test]
    fn owner_coherence() {
        let mut sim = SimCard {
            id: "s1".into(),
            serial: "8901".into(),
            status: SimStatus::Available,
            owner_client_id: None,
            scope: "V001".into(),
            assigned_at: None,
            activated_at: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        assert!(sim.status_matches_owner());

        sim.owner_client_id = Some("c1".into());
        assert!(!sim.status_matches_owner());

        sim.status = SimStatus::Assigned;
        assert!(sim.status_matches_owner());

        sim.status = SimStatus::Terminated;
        assert!(sim.status_matches_owner());
        sim.owner_client_id = None;
        assert!(!sim.status_matches_owner());
    }
}
