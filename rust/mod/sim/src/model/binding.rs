use serde::Serialize;

use crate::service::AssignError;

/// A SIM bound to a client, as reported back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub serial: String,
    pub client_id: String,
    pub client_display_name: String,
}

/// Flat result of an engine call, suitable for forms and JSON responses.
///
/// Failures never escape as errors through this type: `success` is false,
/// `code` names the failure class and `message` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
}

impl AssignOutcome {
    pub fn bound(binding: Binding) -> Self {
        Self {
            success: true,
            code: None,
            message: format!(
                "SIM {} assigned to {}",
                binding.serial, binding.client_display_name
            ),
            binding: Some(binding),
        }
    }

    /// Release result; `released` is `None` when the client held nothing.
    pub fn released(released: Option<Binding>) -> Self {
        let message = match &released {
            Some(b) => format!("SIM {} released from {}", b.serial, b.client_display_name),
            None => "client holds no SIM".to_string(),
        };
        Self {
            success: true,
            code: None,
            message,
            binding: released,
        }
    }

    pub fn failed(err: &AssignError) -> Self {
        Self {
            success: false,
            code: Some(err.code()),
            message: err.public_message(),
            binding: None,
        }
    }
}

impl From<Result<Binding, AssignError>> for AssignOutcome {
    fn from(result: Result<Binding, AssignError>) -> Self {
        match result {
            Ok(binding) => Self::bound(binding),
            Err(e) => Self::failed(&e),
        }
    }
}

impl From<Result<Option<Binding>, AssignError>> for AssignOutcome {
    fn from(result: Result<Option<Binding>, AssignError>) -> Self {
        match result {
            Ok(released) => Self::released(released),
            Err(e) => Self::failed(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> Binding {
        Binding {
            serial: "8934000001".into(),
            client_id: "c1".into(),
            client_display_name: "Acme".into(),
        }
    }

    #[test]
    fn success_outcome_json() {
        let outcome = AssignOutcome::from(Ok::<_, AssignError>(binding()));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["binding"]["serial"], "8934000001");
        assert_eq!(json["binding"]["clientDisplayName"], "Acme");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn failure_outcome_carries_code() {
        let err = AssignError::ScopeMismatch("scope V001 vs V002".into());
        let outcome = AssignOutcome::from(Err::<Binding, _>(err));
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some("SCOPE_MISMATCH"));
        assert!(outcome.binding.is_none());
    }

    #[test]
    fn storage_detail_is_not_exposed() {
        let err = AssignError::Storage("disk I/O error at page 7".into());
        let outcome = AssignOutcome::failed(&err);
        assert_eq!(outcome.code, Some("STORAGE_ERROR"));
        assert!(!outcome.message.contains("page 7"));
    }

    #[test]
    fn empty_release_message() {
        let outcome = AssignOutcome::from(Ok::<Option<Binding>, AssignError>(None));
        assert!(outcome.success);
        assert_eq!(outcome.message, "client holds no SIM");
    }
}
