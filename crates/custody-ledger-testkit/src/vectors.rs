//! Golden test vectors for deterministic verification.
//!
//! Owner tokens and snapshot digests must be identical across every
//! implementation that reads or writes the same ledger.

use serde::{Deserialize, Serialize};

use custody_ledger_core::{
    bind, encode_state, state_digest, Context, RecordHash, RecordState, Secret,
};

/// A golden binding vector.
#[derive(Debug, Clone)]
pub struct BindVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Every byte of the secret.
    pub secret_byte: u8,
    /// Creation counter the context is built from.
    pub sequence: u64,
    /// Expected owner token (hex).
    pub expected_token: &'static str,
}

/// Get all golden binding vectors.
pub fn bind_vectors() -> Vec<BindVector> {
    vec![
        BindVector {
            name: "zero secret, initial context",
            secret_byte: 0x00,
            sequence: 1,
            expected_token: "b48ef8d6669812eecd3078dd236facf3e9d49303d48a5e74bfde126daba7248a",
        },
        BindVector {
            name: "first creation",
            secret_byte: 0x42,
            sequence: 2,
            expected_token: "fea1b3a165eaa57ecef5c380c99e34373840c9115568c5ce312b99dd16562e7b",
        },
        BindVector {
            name: "same secret, later creation",
            secret_byte: 0x42,
            sequence: 3,
            expected_token: "2c5f110924b86d3428d52a216c344d019b3128eb09f2476920f79ca9d5ebd893",
        },
        BindVector {
            name: "all-ones secret",
            secret_byte: 0xff,
            sequence: 2,
            expected_token: "7a2dfbdbd16120e7a678224de0ae39addff8821e6d68be74c9abbb2e427cb829",
        },
        BindVector {
            name: "largest counter",
            secret_byte: 0x01,
            sequence: u64::MAX,
            expected_token: "8287c21c5386c6e7b906dda74bddc0030b73b7ad55efe0e8260bf88ad0b38464",
        },
    ]
}

/// Compute the owner token for a vector.
pub fn token_from_vector(vector: &BindVector) -> String {
    let secret = Secret::from_bytes([vector.secret_byte; 32]);
    bind(&secret, &Context::from_sequence(vector.sequence)).to_hex()
}

/// A golden snapshot vector.
#[derive(Debug, Clone)]
pub struct SnapshotVector {
    pub name: &'static str,
    /// Builds the state being snapshotted.
    pub build: fn() -> RecordState,
    /// Expected length of the canonical encoding.
    pub expected_len: usize,
    /// Expected Blake3 digest of the canonical encoding (hex).
    pub expected_digest: &'static str,
}

fn empty_state() -> RecordState {
    RecordState::new()
}

fn filed_state() -> RecordState {
    let mut state = RecordState::new();
    state
        .create(
            RecordHash::from_bytes([0xaa; 32]),
            &Secret::from_bytes([0x42; 32]),
        )
        .expect("empty slot accepts create");
    state
}

/// Get all golden snapshot vectors.
pub fn snapshot_vectors() -> Vec<SnapshotVector> {
    vec![
        SnapshotVector {
            name: "freshly deployed",
            build: empty_state,
            expected_len: 44,
            expected_digest: "7c04eccdfac8729c3b3c0240defa8ec9d2bf798972f887ecfa5e490f42b3ae4c",
        },
        SnapshotVector {
            name: "filed by 0x42 secret",
            build: filed_state,
            expected_len: 77,
            expected_digest: "fd05b5840dcca5f4d6621542d8df881d5e918c71494b2ce25bdea25def652020",
        },
    ]
}

/// Result of checking one vector, in a form other implementations can diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorReport {
    pub name: String,
    pub matches: bool,
    pub computed: String,
}

/// Check every golden vector against this implementation.
pub fn verify_all_vectors() -> Vec<VectorReport> {
    let binds = bind_vectors().into_iter().map(|v| {
        let computed = token_from_vector(&v);
        VectorReport {
            name: v.name.to_string(),
            matches: computed == v.expected_token,
            computed,
        }
    });

    let snapshots = snapshot_vectors().into_iter().map(|v| {
        let state = (v.build)();
        let computed = state_digest(&state).to_hex();
        VectorReport {
            name: v.name.to_string(),
            matches: computed == v.expected_digest && encode_state(&state).len() == v.expected_len,
            computed,
        }
    });

    binds.chain(snapshots).collect()
}

/// Export the vector reports as pretty JSON.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&verify_all_vectors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for report in verify_all_vectors() {
            assert!(
                report.matches,
                "Vector '{}' computed {}",
                report.name, report.computed
            );
        }
    }

    #[test]
    fn test_filed_vector_uses_bound_token() {
        let state = filed_state();
        let expected = &bind_vectors()[1];
        assert_eq!(state.owner_token().to_hex(), expected.expected_token);
    }

    #[test]
    fn test_vectors_json_roundtrip() {
        let json = vectors_json().unwrap();
        let reports: Vec<VectorReport> = serde_json::from_str(&json).unwrap();
        assert_eq!(reports, verify_all_vectors());
        assert_eq!(hex::decode(&reports[0].computed).unwrap().len(), 32);
    }
}
