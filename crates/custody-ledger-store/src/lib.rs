//! # Custody Ledger Store
//!
//! Storage abstraction for the custody ledger. Two kinds of state are kept
//! apart:
//!
//! - **Private state**: the caller's secrets, keyed by name ([`PrivateStateStore`])
//! - **Public state**: one canonical snapshot per deployed ledger ([`LedgerStore`])
//!
//! ## Key Types
//!
//! - [`Store`] - Both traits together; what the ledger facade needs
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use custody_ledger_store::{PrivateStateStoreExt, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Fetch this caller's secret, generating one on first use
//!     let secret = store.get_or_create_secret("RecordPrivateState").await.unwrap();
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{LedgerStore, PrivateStateStore, PrivateStateStoreExt, Store};

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
