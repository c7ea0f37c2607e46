//! Error types for the ledger facade.

use custody_ledger_core::{LedgerId, TransitionError};
use custody_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The state machine rejected the call.
    #[error("transition rejected: {0}")]
    Transition(#[from] TransitionError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// No ledger with this ID exists in the store.
    #[error("ledger not found: {0:?}")]
    LedgerNotFound(LedgerId),
}

impl LedgerError {
    /// The state-machine rejection, if that is what this error is.
    pub fn transition(&self) -> Option<TransitionError> {
        match self {
            LedgerError::Transition(e) => Some(*e),
            _ => None,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
