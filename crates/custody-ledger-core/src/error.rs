//! Error types for the custody ledger core.

use thiserror::Error;

/// Rejections of a state transition.
///
/// All are deterministic precondition failures. A rejected call never
/// changes the ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a record already exists; update it instead")]
    AlreadyExists,

    #[error("no record is filed")]
    NotFound,

    #[error("secret does not bind to the record's owner token")]
    NotOwner,

    /// Every creation context has been used up.
    #[error("creation counter exhausted")]
    ContextExhausted,
}

/// Errors from encoding, decoding or checking a ledger snapshot.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u8),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
