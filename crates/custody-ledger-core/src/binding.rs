//! Identity binding: (secret, context) -> owner token.
//!
//! The token is `Blake3(BIND_DOMAIN || context || secret)`. Callers compute it
//! locally to learn their identity for the current record; the state machine
//! recomputes it from the secret disclosed with a call and compares it against
//! the stored token.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{OwnerToken, Secret};

/// Domain tag for owner tokens: `"record:pk:"` zero-padded to 32 bytes.
pub const BIND_DOMAIN: [u8; 32] = pad_tag(b"record:pk:");

const fn pad_tag(tag: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < tag.len() {
        out[i] = tag[i];
        i += 1;
    }
    out
}

/// Public value mixed into the binding.
///
/// Derived from the ledger's creation counter so that every filed lifetime
/// gets its own token, even when the same secret files again.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context(pub [u8; 32]);

impl Context {
    /// Context for a creation sequence number.
    ///
    /// Little-endian `u64` in bytes 0..8, zeros elsewhere.
    pub fn from_sequence(sequence: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&sequence.to_le_bytes());
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({})", &hex::encode(self.0)[..16])
    }
}

/// Derive the owner token for `secret` under `context`.
pub fn bind(secret: &Secret, context: &Context) -> OwnerToken {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&BIND_DOMAIN);
    hasher.update(&context.0);
    hasher.update(secret.as_bytes());
    OwnerToken(*hasher.finalize().as_bytes())
}

/// Check whether `secret` binds to `token` under `context`.
pub fn owns(secret: &Secret, context: &Context, token: &OwnerToken) -> bool {
    bind(secret, context) == *token
}
