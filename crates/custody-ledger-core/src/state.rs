//! The record state machine.
//!
//! A ledger holds exactly one record slot. The slot is either `Empty` or
//! `Filed` with a content hash and the owner token minted at creation.
//! Mutations other than `create` are gated on the caller's secret binding to
//! that token.
//!
//! Every operation checks all of its preconditions before writing anything,
//! so a rejected call leaves the state untouched.

use serde::{Deserialize, Serialize};

use crate::binding::{bind, Context};
use crate::crypto::{OwnerToken, Secret};
use crate::error::{CoreError, TransitionError};
use crate::types::RecordHash;

/// Lifecycle status of the record slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    Empty,
    Filed,
}

impl RecordStatus {
    /// Wire tag: 0 = Empty, 1 = Filed.
    pub fn to_u8(self) -> u8 {
        match self {
            RecordStatus::Empty => 0,
            RecordStatus::Filed => 1,
        }
    }

    /// Parse a wire tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(RecordStatus::Empty),
            1 => Some(RecordStatus::Filed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Empty,
    Filed {
        record_hash: RecordHash,
        owner_token: OwnerToken,
    },
}

/// The canonical ledger state.
///
/// `sequence` is the public binding context. It starts at 1 on construction
/// and is bumped before each creation mints its token; `update` and `delete`
/// verify against the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordState {
    slot: Slot,
    sequence: u64,
}

/// Read-only projection of the ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerView {
    pub status: RecordStatus,
    pub record_hash: Option<RecordHash>,
    /// Zero while the slot is empty.
    pub owner_token: OwnerToken,
    pub sequence: u64,
}

impl LedgerView {
    /// The binding context for the current filed lifetime.
    pub fn context(&self) -> Context {
        Context::from_sequence(self.sequence)
    }

    /// Whether `secret` owns the filed record.
    pub fn is_owned_by(&self, secret: &Secret) -> bool {
        self.status == RecordStatus::Filed && bind(secret, &self.context()) == self.owner_token
    }
}

/// A single state-machine call, as a ledger executor would log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Create { record_hash: RecordHash, secret: Secret },
    Update { record_hash: RecordHash, secret: Secret },
    Delete { secret: Secret },
}

impl Transition {
    /// Operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Create { .. } => "create",
            Transition::Update { .. } => "update",
            Transition::Delete { .. } => "delete",
        }
    }
}

impl RecordState {
    /// A freshly constructed, empty ledger.
    pub fn new() -> Self {
        Self {
            slot: Slot::Empty,
            sequence: 1,
        }
    }

    /// Rebuild a state from decoded parts, checking invariants.
    pub fn from_parts(
        record: Option<(RecordHash, OwnerToken)>,
        sequence: u64,
    ) -> Result<Self, CoreError> {
        let slot = match record {
            Some((record_hash, owner_token)) => Slot::Filed {
                record_hash,
                owner_token,
            },
            None => Slot::Empty,
        };
        let state = Self { slot, sequence };
        state.check_invariants()?;
        Ok(state)
    }

    pub fn status(&self) -> RecordStatus {
        match self.slot {
            Slot::Empty => RecordStatus::Empty,
            Slot::Filed { .. } => RecordStatus::Filed,
        }
    }

    pub fn record_hash(&self) -> Option<RecordHash> {
        match self.slot {
            Slot::Empty => None,
            Slot::Filed { record_hash, .. } => Some(record_hash),
        }
    }

    /// The owner token, or zero if the slot is empty.
    pub fn owner_token(&self) -> OwnerToken {
        match self.slot {
            Slot::Empty => OwnerToken::ZERO,
            Slot::Filed { owner_token, .. } => owner_token,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The binding context currently in force.
    pub fn context(&self) -> Context {
        Context::from_sequence(self.sequence)
    }

    /// Read-only projection.
    pub fn read(&self) -> LedgerView {
        LedgerView {
            status: self.status(),
            record_hash: self.record_hash(),
            owner_token: self.owner_token(),
            sequence: self.sequence,
        }
    }

    /// File a new record owned by `secret`.
    pub fn create(
        &mut self,
        new_hash: RecordHash,
        secret: &Secret,
    ) -> Result<(), TransitionError> {
        if let Slot::Filed { .. } = self.slot {
            return Err(TransitionError::AlreadyExists);
        }

        // Each creation needs a context no earlier creation used.
        let sequence = self
            .sequence
            .checked_add(1)
            .ok_or(TransitionError::ContextExhausted)?;
        let owner_token = bind(secret, &Context::from_sequence(sequence));

        self.sequence = sequence;
        self.slot = Slot::Filed {
            record_hash: new_hash,
            owner_token,
        };
        Ok(())
    }

    /// Replace the record's content hash. Owner only.
    pub fn update(
        &mut self,
        new_hash: RecordHash,
        secret: &Secret,
    ) -> Result<(), TransitionError> {
        self.verify_owner(secret)?;

        if let Slot::Filed { record_hash, .. } = &mut self.slot {
            *record_hash = new_hash;
        }
        Ok(())
    }

    /// Clear the record. Owner only.
    pub fn delete(&mut self, secret: &Secret) -> Result<(), TransitionError> {
        self.verify_owner(secret)?;

        self.slot = Slot::Empty;
        Ok(())
    }

    /// Apply a logged transition.
    pub fn apply(&mut self, transition: &Transition) -> Result<(), TransitionError> {
        match transition {
            Transition::Create {
                record_hash,
                secret,
            } => self.create(*record_hash, secret),
            Transition::Update {
                record_hash,
                secret,
            } => self.update(*record_hash, secret),
            Transition::Delete { secret } => self.delete(secret),
        }
    }

    /// Whether `secret` owns the filed record.
    pub fn is_owner(&self, secret: &Secret) -> bool {
        self.verify_owner(secret).is_ok()
    }

    /// Check the invariants a decoded snapshot must satisfy.
    ///
    /// States produced by the transition methods always pass.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        if self.sequence == 0 {
            return Err(CoreError::InvariantViolation(
                "sequence must start at 1".into(),
            ));
        }
        if let Slot::Filed { owner_token, .. } = &self.slot {
            if owner_token.is_zero() {
                return Err(CoreError::InvariantViolation(
                    "filed record has a zero owner token".into(),
                ));
            }
            if self.sequence < 2 {
                return Err(CoreError::InvariantViolation(
                    "filed record without a creation".into(),
                ));
            }
        }
        Ok(())
    }

    fn verify_owner(&self, secret: &Secret) -> Result<(), TransitionError> {
        match &self.slot {
            Slot::Empty => Err(TransitionError::NotFound),
            Slot::Filed { owner_token, .. } => {
                if bind(secret, &self.context()) == *owner_token {
                    Ok(())
                } else {
                    Err(TransitionError::NotOwner)
                }
            }
        }
    }
}

impl Default for RecordState {
    fn default() -> Self {
        Self::new()
    }
}
