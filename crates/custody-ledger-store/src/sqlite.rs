//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend for the custody ledger. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use custody_ledger_core::{
    decode_state, encode_state, state_digest, LedgerId, RecordState, Secret,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::now_millis;
use crate::traits::{LedgerStore, PrivateStateStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection from the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn secret_from_blob(blob: Vec<u8>) -> Result<Secret> {
    let bytes: [u8; 32] = blob
        .try_into()
        .map_err(|b: Vec<u8>| StoreError::InvalidData(format!("secret has {} bytes", b.len())))?;
    Ok(Secret::from_bytes(bytes))
}

fn ledger_id_from_blob(blob: Vec<u8>) -> Result<LedgerId> {
    let bytes: [u8; 32] = blob
        .try_into()
        .map_err(|b: Vec<u8>| StoreError::InvalidData(format!("ledger_id has {} bytes", b.len())))?;
    Ok(LedgerId::from_bytes(bytes))
}

#[async_trait]
impl PrivateStateStore for SqliteStore {
    async fn get_secret(&self, key: &str) -> Result<Option<Secret>> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT secret FROM private_states WHERE state_key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;

            blob.map(secret_from_blob).transpose()
        })
        .await
    }

    async fn set_secret(&self, key: &str, secret: &Secret) -> Result<()> {
        let key = key.to_string();
        let bytes = *secret.as_bytes();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO private_states (state_key, secret, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(state_key) DO UPDATE SET
                    secret = excluded.secret,
                    updated_at = excluded.updated_at",
                params![key, bytes.as_slice(), now_millis()],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn load_state(&self, ledger_id: &LedgerId) -> Result<Option<RecordState>> {
        let ledger_id = *ledger_id;

        self.with_conn(move |conn| {
            let snapshot: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT snapshot FROM ledgers WHERE ledger_id = ?1",
                    params![ledger_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            match snapshot {
                Some(bytes) => Ok(Some(decode_state(&bytes)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn save_state(&self, ledger_id: &LedgerId, state: &RecordState) -> Result<()> {
        let ledger_id = *ledger_id;
        let snapshot = encode_state(state);
        let digest = state_digest(state);
        let status = state.status().to_u8();
        let sequence = state.sequence();

        self.with_conn(move |conn| {
            let now = now_millis();
            let sequence = i64::try_from(sequence)
                .map_err(|_| StoreError::InvalidData(format!("sequence {} overflows", sequence)))?;

            conn.execute(
                "INSERT INTO ledgers (
                    ledger_id, snapshot, state_digest, status, sequence, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                ON CONFLICT(ledger_id) DO UPDATE SET
                    snapshot = excluded.snapshot,
                    state_digest = excluded.state_digest,
                    status = excluded.status,
                    sequence = excluded.sequence,
                    updated_at = excluded.updated_at",
                params![
                    ledger_id.as_bytes().as_slice(),
                    snapshot,
                    digest.as_bytes().as_slice(),
                    status,
                    sequence,
                    now,
                ],
            )?;

            tracing::trace!(ledger = %ledger_id, digest = ?digest, "saved snapshot");
            Ok(())
        })
        .await
    }

    async fn save_state_if(
        &self,
        ledger_id: &LedgerId,
        expected: &RecordState,
        next: &RecordState,
    ) -> Result<bool> {
        let ledger_id = *ledger_id;
        let expected_digest = state_digest(expected);
        let snapshot = encode_state(next);
        let digest = state_digest(next);
        let status = next.status().to_u8();
        let sequence = next.sequence();

        self.with_conn(move |conn| {
            let sequence = i64::try_from(sequence)
                .map_err(|_| StoreError::InvalidData(format!("sequence {} overflows", sequence)))?;

            let changed = conn.execute(
                "UPDATE ledgers SET
                    snapshot = ?1,
                    state_digest = ?2,
                    status = ?3,
                    sequence = ?4,
                    updated_at = ?5
                WHERE ledger_id = ?6 AND state_digest = ?7",
                params![
                    snapshot,
                    digest.as_bytes().as_slice(),
                    status,
                    sequence,
                    now_millis(),
                    ledger_id.as_bytes().as_slice(),
                    expected_digest.as_bytes().as_slice(),
                ],
            )?;

            if changed == 1 {
                tracing::trace!(ledger = %ledger_id, digest = ?digest, "saved snapshot");
            }
            Ok(changed == 1)
        })
        .await
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT ledger_id FROM ledgers ORDER BY ledger_id")?;

            let blobs = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            blobs.into_iter().map(ledger_id_from_blob).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PrivateStateStoreExt;
    use custody_ledger_core::{RecordHash, RecordStatus};

    fn filed_state() -> RecordState {
        let mut state = RecordState::new();
        state
            .create(RecordHash::from_bytes([0xaa; 32]), &Secret::from_bytes([1; 32]))
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_sqlite_secret_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.get_secret("k").await.unwrap().is_none());

        let secret = Secret::from_bytes([9; 32]);
        store.set_secret("k", &secret).await.unwrap();
        assert_eq!(store.get_secret("k").await.unwrap(), Some(secret));

        let replaced = Secret::from_bytes([8; 32]);
        store.set_secret("k", &replaced).await.unwrap();
        assert_eq!(store.get_secret("k").await.unwrap(), Some(replaced));
    }

    #[tokio::test]
    async fn test_sqlite_get_or_create_secret() {
        let store = SqliteStore::open_memory().unwrap();
        let s1 = store.get_or_create_secret("RecordPrivateState").await.unwrap();
        let s2 = store.get_or_create_secret("RecordPrivateState").await.unwrap();
        assert_eq!(s1, s2);
    }

    #[tokio::test]
    async fn test_sqlite_state_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let ledger_id = LedgerId::derive(&[3; 32]);
        assert!(store.load_state(&ledger_id).await.unwrap().is_none());

        store.save_state(&ledger_id, &RecordState::new()).await.unwrap();
        let state = filed_state();
        store.save_state(&ledger_id, &state).await.unwrap();

        let loaded = store.load_state(&ledger_id).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.status(), RecordStatus::Filed);
    }

    #[tokio::test]
    async fn test_sqlite_conditional_save() {
        let store = SqliteStore::open_memory().unwrap();
        let ledger_id = LedgerId::derive(&[7; 32]);
        let empty = RecordState::new();
        let filed = filed_state();

        assert!(!store.save_state_if(&ledger_id, &empty, &filed).await.unwrap());

        store.save_state(&ledger_id, &empty).await.unwrap();
        assert!(store.save_state_if(&ledger_id, &empty, &filed).await.unwrap());
        assert!(!store.save_state_if(&ledger_id, &empty, &empty).await.unwrap());
        assert_eq!(store.load_state(&ledger_id).await.unwrap(), Some(filed.clone()));

        // The denormalized columns follow the snapshot
        let (status, sequence): (u8, i64) = store
            .with_conn(move |conn| {
                Ok(conn.query_row(
                    "SELECT status, sequence FROM ledgers WHERE ledger_id = ?1",
                    params![ledger_id.as_bytes().as_slice()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(status, RecordStatus::Filed.to_u8());
        assert_eq!(sequence, 2);
    }

    #[tokio::test]
    async fn test_sqlite_list_ledgers_sorted() {
        let store = SqliteStore::open_memory().unwrap();
        let a = LedgerId::from_bytes([1; 32]);
        let b = LedgerId::from_bytes([2; 32]);

        store.save_state(&b, &RecordState::new()).await.unwrap();
        store.save_state(&a, &RecordState::new()).await.unwrap();

        assert_eq!(store.list_ledgers().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let ledger_id = LedgerId::derive(&[4; 32]);
        let secret = Secret::from_bytes([5; 32]);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_secret("RecordPrivateState", &secret).await.unwrap();
            store.save_state(&ledger_id, &filed_state()).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get_secret("RecordPrivateState").await.unwrap(),
            Some(secret)
        );
        assert_eq!(
            store.load_state(&ledger_id).await.unwrap(),
            Some(filed_state())
        );
    }

    #[tokio::test]
    async fn test_sqlite_rejects_corrupt_snapshot() {
        let store = SqliteStore::open_memory().unwrap();
        let ledger_id = LedgerId::derive(&[6; 32]);
        store.save_state(&ledger_id, &RecordState::new()).await.unwrap();

        store
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE ledgers SET snapshot = ?1 WHERE ledger_id = ?2",
                    params![vec![0x01u8], ledger_id.as_bytes().as_slice()],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(
            store.load_state(&ledger_id).await,
            Err(StoreError::Snapshot(_))
        ));
    }
}
