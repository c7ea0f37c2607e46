//! Store traits: the abstract interfaces for private and public state.
//!
//! These traits keep the ledger facade storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use custody_ledger_core::{LedgerId, RecordState, Secret};

use crate::error::Result;

/// Private state: the caller's secrets, keyed by name.
///
/// Nothing stored here is ever part of the public ledger state.
#[async_trait]
pub trait PrivateStateStore: Send + Sync {
    /// Get the secret stored under `key`.
    async fn get_secret(&self, key: &str) -> Result<Option<Secret>>;

    /// Store (or overwrite) the secret under `key`.
    async fn set_secret(&self, key: &str, secret: &Secret) -> Result<()>;
}

/// Public state: one snapshot per deployed ledger.
///
/// # Design Notes
///
/// - Snapshots are kept in canonical CBOR, so loading re-checks the state
///   invariants.
/// - `save_state` overwrites unconditionally. Transitions go through
///   `save_state_if`, which only writes over the snapshot they were computed
///   from, so handles racing on one ledger cannot both succeed.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the latest snapshot of a ledger.
    async fn load_state(&self, ledger_id: &LedgerId) -> Result<Option<RecordState>>;

    /// Insert or replace the snapshot of a ledger.
    async fn save_state(&self, ledger_id: &LedgerId, state: &RecordState) -> Result<()>;

    /// Replace the snapshot only if the stored one still equals `expected`.
    ///
    /// Returns `false`, writing nothing, when the ledger is missing or its
    /// snapshot has changed since `expected` was loaded.
    async fn save_state_if(
        &self,
        ledger_id: &LedgerId,
        expected: &RecordState,
        next: &RecordState,
    ) -> Result<bool>;

    /// List all known ledgers, ordered by ID.
    async fn list_ledgers(&self) -> Result<Vec<LedgerId>>;
}

/// A backend that holds both private and public state.
pub trait Store: PrivateStateStore + LedgerStore {}

impl<T: PrivateStateStore + LedgerStore + ?Sized> Store for T {}

/// Extension trait for common private-state patterns.
pub trait PrivateStateStoreExt: PrivateStateStore {
    /// Get the secret under `key`, generating and storing a fresh one if absent.
    fn get_or_create_secret(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Secret>> + Send;
}

impl<S: PrivateStateStore + ?Sized> PrivateStateStoreExt for S {
    async fn get_or_create_secret(&self, key: &str) -> Result<Secret> {
        if let Some(secret) = self.get_secret(key).await? {
            return Ok(secret);
        }

        let secret = Secret::generate();
        self.set_secret(key, &secret).await?;
        tracing::debug!(key, "generated new private state");
        Ok(secret)
    }
}
