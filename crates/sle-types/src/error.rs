use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),

    #[error("identifier must not be blank")]
    BlankIdentifier,

    #[error("unknown unit type: {0}")]
    UnknownUnitType(String),

    #[error("invalid transaction transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}
