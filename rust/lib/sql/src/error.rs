use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// Failure to open, commit or roll back a transaction.
    #[error("transaction error: {0}")]
    Transaction(String),
}

impl SQLError {
    /// Whether the error was raised by a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            SQLError::Execution(msg) | SQLError::Query(msg) => msg.contains("UNIQUE constraint"),
            _ => false,
        }
    }
}
