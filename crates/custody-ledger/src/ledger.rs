//! The record ledger: unified API for one deployed custody ledger.
//!
//! A `RecordLedger` is the caller-side collaborator of the state machine. It
//! holds the caller's secret (from the private-state store), runs transitions
//! against the latest public snapshot and persists the result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use custody_ledger_core::{
    bind, LedgerId, LedgerView, OwnerToken, RecordHash, RecordState, RecordStatus, Secret,
    TransitionError,
};
use custody_ledger_store::{PrivateStateStoreExt, Store};

use crate::error::{LedgerError, Result};

/// Default private-state key for the caller's secret.
pub const DEFAULT_PRIVATE_STATE_KEY: &str = "RecordPrivateState";

/// Configuration for a ledger handle.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Key under which the caller's secret lives in the private-state store.
    pub private_state_key: String,
}

impl LedgerConfig {
    /// Use a different private-state key (one key per logical caller).
    pub fn with_private_state_key(mut self, key: impl Into<String>) -> Self {
        self.private_state_key = key.into();
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            private_state_key: DEFAULT_PRIVATE_STATE_KEY.to_string(),
        }
    }
}

/// Public state combined with the caller's private view of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedState {
    pub status: RecordStatus,
    pub record_hash: Option<RecordHash>,
    pub owner_token: OwnerToken,
    /// Whether the caller's secret binds to `owner_token`.
    pub is_owner: bool,
}

/// A handle on one deployed ledger, acting with one caller's secret.
///
/// Transitions through one handle are serialized. Each one runs on a copy of
/// the latest stored state and is persisted with a conditional save, so a
/// failed call never leaves a partial change behind and two handles on one
/// ledger can never both file a record.
pub struct RecordLedger<S: Store> {
    /// Which ledger this handle operates on.
    ledger_id: LedgerId,
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: LedgerConfig,
    /// The caller's secret. Never logged, never persisted publicly.
    secret: Secret,
    /// Last known public state.
    state: Mutex<RecordState>,
}

impl<S: Store> RecordLedger<S> {
    /// Deploy a new, empty ledger.
    pub async fn deploy(store: Arc<S>, config: LedgerConfig) -> Result<Self> {
        let secret = store
            .get_or_create_secret(&config.private_state_key)
            .await?;

        let ledger_id = LedgerId::generate();
        let state = RecordState::new();
        store.save_state(&ledger_id, &state).await?;

        tracing::info!(ledger = %ledger_id, "deployed ledger");

        Ok(Self {
            ledger_id,
            store,
            config,
            secret,
            state: Mutex::new(state),
        })
    }

    /// Join an already deployed ledger.
    pub async fn join(store: Arc<S>, ledger_id: LedgerId, config: LedgerConfig) -> Result<Self> {
        let secret = store
            .get_or_create_secret(&config.private_state_key)
            .await?;

        let state = store
            .load_state(&ledger_id)
            .await?
            .ok_or(LedgerError::LedgerNotFound(ledger_id))?;

        tracing::info!(
            ledger = %ledger_id,
            status = ?state.status(),
            sequence = state.sequence(),
            "joined ledger"
        );

        Ok(Self {
            ledger_id,
            store,
            config,
            secret,
            state: Mutex::new(state),
        })
    }

    /// The ID of this ledger.
    pub fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// File a new record owned by this caller.
    pub async fn add_record(&self, record_hash: RecordHash) -> Result<()> {
        self.transact("create", Some(record_hash), |state, secret| {
            state.create(record_hash, secret)
        })
        .await
    }

    /// Replace the filed record's hash. Fails unless this caller created it.
    pub async fn update_record(&self, record_hash: RecordHash) -> Result<()> {
        self.transact("update", Some(record_hash), |state, secret| {
            state.update(record_hash, secret)
        })
        .await
    }

    /// Clear the filed record. Fails unless this caller created it.
    pub async fn delete_record(&self) -> Result<()> {
        self.transact("delete", None, |state, secret| state.delete(secret))
            .await
    }

    async fn transact<F>(&self, op: &'static str, record_hash: Option<RecordHash>, f: F) -> Result<()>
    where
        F: Fn(&mut RecordState, &Secret) -> std::result::Result<(), TransitionError>,
    {
        let mut current = self.state.lock().await;

        // Another handle may write between our load and save; the conditional
        // save then fails and the transition is re-run on the newer snapshot.
        let next = loop {
            let latest = self.load().await?;

            let mut next = latest.clone();
            if let Err(e) = f(&mut next, &self.secret) {
                *current = latest;
                tracing::warn!(ledger = %self.ledger_id, op, error = %e, "transition rejected");
                return Err(e.into());
            }

            if self.store.save_state_if(&self.ledger_id, &latest, &next).await? {
                break next;
            }
            tracing::debug!(ledger = %self.ledger_id, op, "snapshot changed concurrently, retrying");
        };
        *current = next;

        match record_hash {
            Some(hash) => {
                tracing::info!(ledger = %self.ledger_id, op, record = %hash, "transition applied")
            }
            None => tracing::info!(ledger = %self.ledger_id, op, "transition applied"),
        }
        tracing::trace!(
            ledger = %self.ledger_id,
            status = ?current.status(),
            owner = ?current.owner_token(),
            sequence = current.sequence(),
            "ledger state changed"
        );

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Latest public state of the ledger.
    pub async fn state(&self) -> Result<LedgerView> {
        let latest = self.load().await?;
        let mut current = self.state.lock().await;
        *current = latest;
        Ok(current.read())
    }

    /// Latest public state combined with this caller's ownership.
    pub async fn derived_state(&self) -> Result<DerivedState> {
        let view = self.state().await?;
        let is_owner = view.is_owned_by(&self.secret);

        Ok(DerivedState {
            status: view.status,
            record_hash: view.record_hash,
            owner_token: view.owner_token,
            is_owner,
        })
    }

    /// This caller's identity token under the ledger's current context.
    ///
    /// Equal to the owner token exactly when this caller owns the filed record.
    pub async fn identity_token(&self) -> Result<OwnerToken> {
        let view = self.state().await?;
        Ok(bind(&self.secret, &view.context()))
    }

    async fn load(&self) -> Result<RecordState> {
        self.store
            .load_state(&self.ledger_id)
            .await?
            .ok_or(LedgerError::LedgerNotFound(self.ledger_id))
    }
}
