//! # Custody Ledger Core
//!
//! Pure primitives for the custody ledger: a single-record slot whose
//! mutations are gated on a secret that never appears in the public state.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over fixed-width values.
//!
//! ## Key Types
//!
//! - [`RecordState`] - The canonical ledger state and its transitions
//! - [`RecordHash`] - Content reference to the record's data
//! - [`OwnerToken`] - Public identity derived from a [`Secret`]
//! - [`Context`] - Public value mixed into the binding
//!
//! ## Identity Binding
//!
//! [`bind`] maps `(secret, context)` to an owner token with Blake3 under a
//! fixed domain tag. `create` mints the token; `update` and `delete`
//! recompute it from the caller's secret and compare.
//!
//! ## Canonicalization
//!
//! Ledger snapshots are encoded using deterministic CBOR. See [`canonical`] module.

pub mod binding;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod state;
pub mod types;

pub use binding::{bind, owns, Context, BIND_DOMAIN};
pub use canonical::{decode_state, encode_state, state_digest, SNAPSHOT_VERSION};
pub use crypto::{Blake3Hash, OwnerToken, Secret};
pub use error::{CoreError, TransitionError};
pub use state::{LedgerView, RecordState, RecordStatus, Transition};
pub use types::{LedgerId, RecordHash};
