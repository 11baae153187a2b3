use thiserror::Error;

use crate::ledger::{store::StoreError, LedgerError};

/// Canonical error type returned by command processing.
#[derive(Debug, Error)]
pub enum BankError {
    /// Malformed command line, missing arguments, bad amount or account reference.
    #[error("invalid command format")]
    Format,

    /// First token does not name a known command.
    #[error("unknown command")]
    UnknownCommand,

    /// Domain rule violated by the requested ledger operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Persisting the ledger failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
