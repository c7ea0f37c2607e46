//! Canonical CBOR encoding of the ledger state.
//!
//! A snapshot is a CBOR map with small integer keys, written in RFC 8949
//! core deterministic form:
//! - keys in ascending order
//! - integers in their shortest encoding
//! - definite lengths only
//!
//! The same state always encodes to the same bytes, so the snapshot digest
//! can be compared across replicas. Decoding is strict: input that does not
//! re-encode to identical bytes is rejected.

use ciborium::value::Value;

use crate::crypto::{Blake3Hash, OwnerToken};
use crate::error::CoreError;
use crate::state::{RecordState, RecordStatus};
use crate::types::RecordHash;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 0;

/// Snapshot field keys.
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const STATUS: u64 = 1;
    pub const RECORD_HASH: u64 = 2;
    pub const OWNER_TOKEN: u64 = 3;
    pub const SEQUENCE: u64 = 4;
}

/// Encode a ledger state to canonical bytes.
pub fn encode_state(state: &RecordState) -> Vec<u8> {
    let mut buf = Vec::with_capacity(96);

    // Map header: 5 entries, keys already ascending.
    encode_uint(&mut buf, 5, 5);

    encode_uint(&mut buf, 0, keys::VERSION);
    encode_uint(&mut buf, 0, SNAPSHOT_VERSION.into());

    encode_uint(&mut buf, 0, keys::STATUS);
    encode_uint(&mut buf, 0, state.status().to_u8().into());

    encode_uint(&mut buf, 0, keys::RECORD_HASH);
    match state.record_hash() {
        Some(hash) => encode_bytes(&mut buf, hash.as_bytes()),
        None => buf.push(0xf6),
    }

    encode_uint(&mut buf, 0, keys::OWNER_TOKEN);
    encode_bytes(&mut buf, state.owner_token().as_bytes());

    encode_uint(&mut buf, 0, keys::SEQUENCE);
    encode_uint(&mut buf, 0, state.sequence());

    buf
}

/// Blake3 digest of the canonical encoding.
pub fn state_digest(state: &RecordState) -> Blake3Hash {
    Blake3Hash::hash(&encode_state(state))
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Decode a ledger state from canonical bytes.
pub fn decode_state(bytes: &[u8]) -> Result<RecordState, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = match &value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedSnapshot("expected map".into())),
    };

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
            .map(|(_, v)| v)
    };

    let version = match get(keys::VERSION) {
        Some(Value::Integer(i)) => u8::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedSnapshot("version out of range".into()))?,
        _ => return Err(CoreError::MalformedSnapshot("missing version".into())),
    };
    if version != SNAPSHOT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let status = match get(keys::STATUS) {
        Some(Value::Integer(i)) => u8::try_from(i128::from(*i))
            .ok()
            .and_then(RecordStatus::from_u8)
            .ok_or_else(|| CoreError::MalformedSnapshot("invalid status".into()))?,
        _ => return Err(CoreError::MalformedSnapshot("missing status".into())),
    };

    let record_hash = match get(keys::RECORD_HASH) {
        Some(Value::Bytes(b)) => Some(
            RecordHash::try_from(b.as_slice())
                .map_err(|_| CoreError::MalformedSnapshot("invalid record_hash".into()))?,
        ),
        Some(Value::Null) => None,
        _ => return Err(CoreError::MalformedSnapshot("missing record_hash".into())),
    };

    let owner_token = match get(keys::OWNER_TOKEN) {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            OwnerToken(arr)
        }
        _ => return Err(CoreError::MalformedSnapshot("invalid owner_token".into())),
    };

    let sequence = match get(keys::SEQUENCE) {
        Some(Value::Integer(i)) => u64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedSnapshot("sequence out of range".into()))?,
        _ => return Err(CoreError::MalformedSnapshot("missing sequence".into())),
    };

    let record = match (status, record_hash) {
        (RecordStatus::Filed, Some(hash)) => Some((hash, owner_token)),
        (RecordStatus::Empty, None) => None,
        _ => {
            return Err(CoreError::InvariantViolation(
                "record_hash must be present iff status is filed".into(),
            ))
        }
    };

    let state = RecordState::from_parts(record, sequence)?;

    if encode_state(&state) != bytes {
        return Err(CoreError::MalformedSnapshot("non-canonical encoding".into()));
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secret;

    fn filed_state() -> RecordState {
        let mut state = RecordState::new();
        state
            .create(RecordHash::from_bytes([0xaa; 32]), &Secret::from_bytes([1; 32]))
            .unwrap();
        state
    }

    #[test]
    fn test_empty_state_layout() {
        let bytes = encode_state(&RecordState::new());

        assert_eq!(bytes[0], 0xa5); // map, 5 entries
        assert_eq!(&bytes[1..3], &[0x00, 0x00]); // version 0
        assert_eq!(&bytes[3..5], &[0x01, 0x00]); // status empty
        assert_eq!(&bytes[5..7], &[0x02, 0xf6]); // record_hash null
        assert_eq!(&bytes[7..9], &[0x03, 0x58]); // owner_token bstr(32)
        assert_eq!(bytes[9], 32);
        assert_eq!(&bytes[42..44], &[0x04, 0x01]); // sequence 1
        assert_eq!(bytes.len(), 44);
    }

    #[test]
    fn test_encoding_deterministic() {
        let state = filed_state();
        assert_eq!(encode_state(&state), encode_state(&state.clone()));
        assert_eq!(state_digest(&state), state_digest(&state.clone()));
    }

    #[test]
    fn test_decode_restores_state() {
        let state = filed_state();
        let decoded = decode_state(&encode_state(&state)).unwrap();
        assert_eq!(decoded, state);

        let empty = RecordState::new();
        assert_eq!(decode_state(&encode_state(&empty)).unwrap(), empty);
    }

    #[test]
    fn test_digest_tracks_state() {
        let empty = RecordState::new();
        assert_ne!(state_digest(&empty), state_digest(&filed_state()));
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, u64::MAX);
        assert_eq!(buf[0], 0x1b);
        assert_eq!(buf.len(), 9);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_state(&[]).is_err());
        assert!(decode_state(&[0x01]).is_err()); // integer, not map
    }

    #[test]
    fn test_decode_rejects_status_hash_mismatch() {
        let mut bytes = encode_state(&RecordState::new());
        bytes[4] = 0x01; // status filed, record_hash still null
        assert!(matches!(
            decode_state(&bytes),
            Err(CoreError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = encode_state(&RecordState::new());
        bytes[2] = 0x07;
        assert!(matches!(
            decode_state(&bytes),
            Err(CoreError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_decode_rejects_zero_sequence() {
        let mut bytes = encode_state(&RecordState::new());
        bytes[43] = 0x00;
        assert!(matches!(
            decode_state(&bytes),
            Err(CoreError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        // Sequence 1 written in a two-byte form.
        let mut bytes = encode_state(&RecordState::new());
        bytes.truncate(43);
        bytes.extend_from_slice(&[0x18, 0x01]);
        assert!(matches!(
            decode_state(&bytes),
            Err(CoreError::MalformedSnapshot(_))
        ));
    }
}
