//! # Custody Ledger
//!
//! The unified API for a single-record custody ledger: one record slot whose
//! mutations are gated on a secret the caller never publishes.
//!
//! ## Overview
//!
//! - **Public state**: record status, record hash, owner token and a
//!   binding-context counter, persisted as a canonical snapshot
//! - **Private state**: each caller's 32-byte secret, kept under a named key
//! - **Binding**: `owner_token = bind(secret, context)`; only the creator can
//!   reproduce it, so only the creator can update or delete
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use custody_ledger::{LedgerConfig, RecordHash, RecordLedger};
//! use custody_ledger::store::SqliteStore;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("ledger.db").unwrap());
//!
//!     // Deploy a fresh ledger with the default private-state key
//!     let ledger = RecordLedger::deploy(store.clone(), LedgerConfig::default())
//!         .await
//!         .unwrap();
//!
//!     // File a record; this caller becomes its owner
//!     ledger
//!         .add_record(RecordHash::of_content(b"lab results"))
//!         .await
//!         .unwrap();
//!
//!     // Another caller joins the same ledger with its own secret
//!     let other = RecordLedger::join(
//!         store,
//!         ledger.ledger_id(),
//!         LedgerConfig::default().with_private_state_key("other"),
//!     )
//!     .await
//!     .unwrap();
//!     assert!(other.delete_record().await.is_err());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `custody_ledger::core` - Core primitives (RecordState, bind, etc.)
//! - `custody_ledger::store` - Storage abstraction and SQLite

pub mod error;
pub mod ledger;

// Re-export component crates
pub use custody_ledger_core as core;
pub use custody_ledger_store as store;

pub use error::{LedgerError, Result};
pub use ledger::{DerivedState, LedgerConfig, RecordLedger, DEFAULT_PRIVATE_STATE_KEY};

// Re-export commonly used core types
pub use custody_ledger_core::{
    bind, LedgerId, LedgerView, OwnerToken, RecordHash, RecordState, RecordStatus, Secret,
    TransitionError,
};
