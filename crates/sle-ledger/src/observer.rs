use sle_types::Transaction;

use crate::error::ObserverError;

/// Receives every transaction that reaches a terminal status.
///
/// Returned errors (and panics) are logged by the manager and otherwise
/// ignored.
pub trait TransactionObserver {
    /// Name used in log lines.
    fn name(&self) -> &str {
        "observer"
    }

    fn on_transaction(&self, transaction: &Transaction) -> Result<(), ObserverError>;
}

pub struct NoOpObserver;

impl TransactionObserver for NoOpObserver {
    fn name(&self) -> &str {
        "noop"
    }

    fn on_transaction(&self, _transaction: &Transaction) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// Adapts a closure into an observer.
pub struct FnObserver<F> {
    name: String,
    callback: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&Transaction) -> Result<(), ObserverError>,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> TransactionObserver for FnObserver<F>
where
    F: Fn(&Transaction) -> Result<(), ObserverError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_transaction(&self, transaction: &Transaction) -> Result<(), ObserverError> {
        (self.callback)(transaction)
    }
}
