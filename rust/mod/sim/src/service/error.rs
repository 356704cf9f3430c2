use salesops_core::ServiceError;
use salesops_sql::SQLError;
use thiserror::Error;

/// Failure classes of the assignment engine.
///
/// A failed call leaves both tables exactly as they were before it.
#[derive(Error, Debug)]
pub enum AssignError {
    /// SIM or client does not resolve, the client is soft-deleted, or the
    /// pool has no free card.
    #[error("{0}")]
    NotFound(String),

    /// The card is not in a state that allows the operation. A lost race
    /// for the same card lands here.
    #[error("{0}")]
    InvalidState(String),

    /// Card and client belong to different scopes.
    #[error("{0}")]
    ScopeMismatch(String),

    /// A row contradicts the binding invariants at read time.
    #[error("{0}")]
    ConsistencyFault(String),

    /// Database failure.
    #[error("{0}")]
    Storage(String),
}

impl AssignError {
    pub fn code(&self) -> &'static str {
        match self {
            AssignError::NotFound(_) => "NOT_FOUND",
            AssignError::InvalidState(_) => "INVALID_STATE",
            AssignError::ScopeMismatch(_) => "SCOPE_MISMATCH",
            AssignError::ConsistencyFault(_) => "CONSISTENCY_FAULT",
            AssignError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Message safe to show to an operator. Storage details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            AssignError::Storage(_) => "storage failure, nothing was changed".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<SQLError> for AssignError {
    fn from(e: SQLError) -> Self {
        AssignError::Storage(e.to_string())
    }
}

impl From<AssignError> for ServiceError {
    fn from(e: AssignError) -> Self {
        match e {
            AssignError::NotFound(msg) => ServiceError::NotFound(msg),
            AssignError::InvalidState(msg) => ServiceError::Conflict(msg),
            AssignError::ScopeMismatch(msg) => ServiceError::Validation(msg),
            AssignError::ConsistencyFault(msg) => ServiceError::Internal(msg),
            AssignError::Storage(msg) => ServiceError::Storage(msg),
        }
    }
}

/// Map a SQL error from a non-engine path, turning UNIQUE violations into
/// conflicts.
pub(crate) fn storage_error(e: SQLError) -> ServiceError {
    if e.is_unique_violation() {
        ServiceError::Conflict(e.to_string())
    } else {
        ServiceError::Storage(e.to_string())
    }
}
