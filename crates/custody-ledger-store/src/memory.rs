//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! (snapshots go through the canonical codec) but keeps everything in memory
//! with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use custody_ledger_core::{decode_state, encode_state, LedgerId, RecordState, Secret};

use crate::error::Result;
use crate::traits::{LedgerStore, PrivateStateStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Secrets indexed by private-state key.
    secrets: HashMap<String, Secret>,

    /// Canonical snapshots indexed by ledger.
    ledgers: BTreeMap<LedgerId, Vec<u8>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                secrets: HashMap::new(),
                ledgers: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrivateStateStore for MemoryStore {
    async fn get_secret(&self, key: &str) -> Result<Option<Secret>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.secrets.get(key).cloned())
    }

    async fn set_secret(&self, key: &str, secret: &Secret) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.secrets.insert(key.to_string(), secret.clone());
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load_state(&self, ledger_id: &LedgerId) -> Result<Option<RecordState>> {
        let inner = self.inner.read().unwrap();
        match inner.ledgers.get(ledger_id) {
            Some(bytes) => Ok(Some(decode_state(bytes)?)),
            None => Ok(None),
        }
    }

    async fn save_state(&self, ledger_id: &LedgerId, state: &RecordState) -> Result<()> {
        let snapshot = encode_state(state);
        let mut inner = self.inner.write().unwrap();
        inner.ledgers.insert(*ledger_id, snapshot);
        Ok(())
    }

    async fn save_state_if(
        &self,
        ledger_id: &LedgerId,
        expected: &RecordState,
        next: &RecordState,
    ) -> Result<bool> {
        let expected = encode_state(expected);
        let next = encode_state(next);
        let mut inner = self.inner.write().unwrap();
        match inner.ledgers.get_mut(ledger_id) {
            Some(stored) if *stored == expected => {
                *stored = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerId>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.ledgers.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PrivateStateStoreExt;
    use custody_ledger_core::{RecordHash, RecordStatus};

    #[tokio::test]
    async fn test_memory_store_secret() {
        let store = MemoryStore::new();
        assert!(store.get_secret("k").await.unwrap().is_none());

        let secret = Secret::from_bytes([7; 32]);
        store.set_secret("k", &secret).await.unwrap();
        assert_eq!(store.get_secret("k").await.unwrap(), Some(secret));
    }

    #[tokio::test]
    async fn test_get_or_create_secret_is_stable() {
        let store = MemoryStore::new();
        let s1 = store.get_or_create_secret("RecordPrivateState").await.unwrap();
        let s2 = store.get_or_create_secret("RecordPrivateState").await.unwrap();
        assert_eq!(s1, s2);

        let other = store.get_or_create_secret("other").await.unwrap();
        assert_ne!(s1, other);
    }

    #[tokio::test]
    async fn test_memory_store_state() {
        let store = MemoryStore::new();
        let ledger_id = LedgerId::derive(&[1; 32]);
        assert!(store.load_state(&ledger_id).await.unwrap().is_none());

        let mut state = RecordState::new();
        state
            .create(RecordHash::from_bytes([0xaa; 32]), &Secret::from_bytes([1; 32]))
            .unwrap();
        store.save_state(&ledger_id, &state).await.unwrap();

        let loaded = store.load_state(&ledger_id).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.status(), RecordStatus::Filed);
        assert_eq!(store.list_ledgers().await.unwrap(), vec![ledger_id]);
    }

    #[tokio::test]
    async fn test_memory_store_overwrites_state() {
        let store = MemoryStore::new();
        let ledger_id = LedgerId::derive(&[1; 32]);
        let secret = Secret::from_bytes([1; 32]);

        let mut state = RecordState::new();
        store.save_state(&ledger_id, &state).await.unwrap();
        state
            .create(RecordHash::from_bytes([0xaa; 32]), &secret)
            .unwrap();
        store.save_state(&ledger_id, &state).await.unwrap();

        let loaded = store.load_state(&ledger_id).await.unwrap().unwrap();
        assert_eq!(loaded.record_hash(), Some(RecordHash::from_bytes([0xaa; 32])));
        assert_eq!(store.list_ledgers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_conditional_save() {
        let store = MemoryStore::new();
        let ledger_id = LedgerId::derive(&[2; 32]);
        let empty = RecordState::new();

        let mut first = empty.clone();
        first
            .create(RecordHash::from_bytes([1; 32]), &Secret::from_bytes([1; 32]))
            .unwrap();
        let mut second = empty.clone();
        second
            .create(RecordHash::from_bytes([2; 32]), &Secret::from_bytes([2; 32]))
            .unwrap();

        // Missing ledger
        assert!(!store.save_state_if(&ledger_id, &empty, &first).await.unwrap());
        assert!(store.load_state(&ledger_id).await.unwrap().is_none());

        store.save_state(&ledger_id, &empty).await.unwrap();
        assert!(store.save_state_if(&ledger_id, &empty, &first).await.unwrap());

        // Both were computed from the empty state; only one may land
        assert!(!store.save_state_if(&ledger_id, &empty, &second).await.unwrap());
        assert_eq!(store.load_state(&ledger_id).await.unwrap(), Some(first));
    }
}
