//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use custody_ledger::{LedgerConfig, LedgerId, RecordLedger, Result};
use custody_ledger_core::{bind, Context, OwnerToken, Secret};
use custody_ledger_store::{MemoryStore, PrivateStateStore};

/// A test fixture: one caller with a known secret and a memory store.
pub struct TestFixture {
    /// Seed the secret was built from.
    pub seed: [u8; 32],
    pub secret: Secret,
    /// Private-state key the secret is stored under.
    pub state_key: String,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a new test fixture with a random secret.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create with a deterministic secret.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::on_store(seed, "RecordPrivateState", Arc::new(MemoryStore::new()))
    }

    fn on_store(seed: [u8; 32], state_key: &str, store: Arc<MemoryStore>) -> Self {
        Self {
            seed,
            secret: Secret::from_bytes(seed),
            state_key: state_key.to_string(),
            store,
        }
    }

    /// The token this caller mints when filing under `sequence`.
    pub fn token_at(&self, sequence: u64) -> OwnerToken {
        bind(&self.secret, &Context::from_sequence(sequence))
    }

    /// Ledger config pointing at this fixture's private-state key.
    pub fn config(&self) -> LedgerConfig {
        LedgerConfig::default().with_private_state_key(self.state_key.clone())
    }

    /// Deploy a new ledger acting as this caller.
    pub async fn deploy(&self) -> Result<RecordLedger<MemoryStore>> {
        self.store.set_secret(&self.state_key, &self.secret).await?;
        RecordLedger::deploy(Arc::clone(&self.store), self.config()).await
    }

    /// Join an existing ledger acting as this caller.
    pub async fn join(&self, ledger_id: LedgerId) -> Result<RecordLedger<MemoryStore>> {
        self.store.set_secret(&self.state_key, &self.secret).await?;
        RecordLedger::join(Arc::clone(&self.store), ledger_id, self.config()).await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create fixtures for several callers sharing one store.
///
/// Caller `i` has seed `[i + 1; 32]` and state key `owner-{i}`.
pub fn multi_owner_fixtures(count: usize) -> Vec<TestFixture> {
    let store = Arc::new(MemoryStore::new());
    (0..count)
        .map(|i| {
            let seed = [(i as u8).wrapping_add(1); 32];
            TestFixture::on_store(seed, &format!("owner-{}", i), Arc::clone(&store))
        })
        .collect()
}
