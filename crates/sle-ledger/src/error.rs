use sle_economy::EconomyError;
use sle_types::{TransactionId, TypeError};

/// Failure reported by a [`TransactionObserver`](crate::TransactionObserver).
///
/// Observer errors are logged and swallowed at the notification boundary;
/// they never change a transaction's recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("observer {observer} failed: {message}")]
pub struct ObserverError {
    pub observer: String,
    pub message: String,
}

impl ObserverError {
    pub fn new(observer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            observer: observer.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by ledger operations.
///
/// None of these leave a [`GameState`](crate::GameState) changed: every
/// operation that fails returns before a new snapshot exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transaction id {0} already exists")]
    DuplicateId(TransactionId),

    #[error("atomicity violation: {0}")]
    AtomicityViolation(String),

    #[error(transparent)]
    Observer(#[from] ObserverError),

    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<EconomyError> for LedgerError {
    fn from(err: EconomyError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
