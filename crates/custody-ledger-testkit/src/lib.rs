//! # Custody Ledger Testkit
//!
//! Testing utilities for the custody ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Owner tokens and snapshot digests with fixed expected values
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Callers with known secrets on a shared memory store
//!
//! ## Golden Vectors
//!
//! ```rust
//! use custody_ledger_testkit::vectors::verify_all_vectors;
//!
//! for report in verify_all_vectors() {
//!     assert!(report.matches, "{}: {}", report.name, report.computed);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use custody_ledger_testkit::generators::{replay, TransitionRun};
//!
//! proptest! {
//!     #[test]
//!     fn replay_is_deterministic(run: TransitionRun) {
//!         prop_assert_eq!(replay(&run), replay(&run));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use custody_ledger_testkit::fixtures::multi_owner_fixtures;
//!
//! async fn example() {
//!     let owners = multi_owner_fixtures(2);
//!     let ledger = owners[0].deploy().await.unwrap();
//!     let other = owners[1].join(ledger.ledger_id()).await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_owner_fixtures, TestFixture};
pub use generators::{replay, TransitionRun};
pub use vectors::{bind_vectors, snapshot_vectors, verify_all_vectors, BindVector, VectorReport};
