//! Proptest generators for property-based testing.

use proptest::prelude::*;

use custody_ledger_core::{RecordHash, RecordState, Secret, Transition};

/// Generate a random secret.
pub fn secret() -> impl Strategy<Value = Secret> {
    any::<[u8; 32]>().prop_map(Secret::from_bytes)
}

/// Generate a random RecordHash.
pub fn record_hash() -> impl Strategy<Value = RecordHash> {
    any::<[u8; 32]>().prop_map(RecordHash::from_bytes)
}

/// Generate a creation counter value (never zero).
pub fn sequence() -> impl Strategy<Value = u64> {
    1u64..=u64::MAX
}

/// Generate a transition whose secret is drawn from `pool`.
///
/// A small pool makes owner matches likely, so runs exercise the accepted
/// paths as well as the rejections.
pub fn transition(pool: Vec<Secret>) -> impl Strategy<Value = Transition> {
    let len = pool.len();
    assert!(len > 0, "secret pool must not be empty");

    (0..3u8, 0..len, record_hash()).prop_map(move |(op, who, record_hash)| {
        let secret = pool[who].clone();
        match op {
            0 => Transition::Create {
                record_hash,
                secret,
            },
            1 => Transition::Update {
                record_hash,
                secret,
            },
            _ => Transition::Delete { secret },
        }
    })
}

/// Parameters for a run of transitions against a fresh ledger.
#[derive(Debug, Clone)]
pub struct TransitionRun {
    /// Secrets of the callers taking part.
    pub secrets: Vec<Secret>,
    pub transitions: Vec<Transition>,
}

impl Arbitrary for TransitionRun {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(secret(), 1..=3)
            .prop_flat_map(|secrets| {
                let transitions = prop::collection::vec(transition(secrets.clone()), 0..=32);
                (Just(secrets), transitions)
            })
            .prop_map(|(secrets, transitions)| TransitionRun {
                secrets,
                transitions,
            })
            .boxed()
    }
}

/// Apply every transition of a run to a fresh state, ignoring rejections.
///
/// Returns the final state and how many transitions were accepted.
pub fn replay(run: &TransitionRun) -> (RecordState, usize) {
    let mut state = RecordState::new();
    let accepted = run
        .transitions
        .iter()
        .filter(|t| state.apply(t).is_ok())
        .count();
    (state, accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger_core::{
        bind, decode_state, encode_state, Context, RecordStatus, TransitionError,
    };

    proptest! {
        #[test]
        fn test_hash_present_iff_filed(run: TransitionRun) {
            let mut state = RecordState::new();
            for t in &run.transitions {
                let _ = state.apply(t);
                let view = state.read();
                prop_assert_eq!(view.record_hash.is_some(), view.status == RecordStatus::Filed);
                prop_assert_eq!(view.owner_token.is_zero(), view.status == RecordStatus::Empty);
            }
        }

        #[test]
        fn test_rejected_transition_leaves_state_unchanged(run: TransitionRun) {
            let mut state = RecordState::new();
            for t in &run.transitions {
                let before = state.clone();
                if state.apply(t).is_err() {
                    prop_assert_eq!(&state, &before);
                }
            }
        }

        #[test]
        fn test_sequence_counts_creations(run: TransitionRun) {
            let mut state = RecordState::new();
            let mut creations = 0u64;
            for t in &run.transitions {
                if state.apply(t).is_ok() && matches!(t, Transition::Create { .. }) {
                    creations += 1;
                }
            }
            prop_assert_eq!(state.sequence(), 1 + creations);
        }

        #[test]
        fn test_replay_is_deterministic(run: TransitionRun) {
            let (s1, n1) = replay(&run);
            let (s2, n2) = replay(&run);
            prop_assert_eq!(n1, n2);
            prop_assert_eq!(encode_state(&s1), encode_state(&s2));
        }

        #[test]
        fn test_reachable_states_survive_snapshot(run: TransitionRun) {
            let (state, _) = replay(&run);
            let decoded = decode_state(&encode_state(&state)).unwrap();
            prop_assert_eq!(decoded, state);
        }

        #[test]
        fn test_second_create_already_exists(
            s1 in secret(),
            s2 in secret(),
            h1 in record_hash(),
            h2 in record_hash(),
        ) {
            let mut state = RecordState::new();
            state.create(h1, &s1).unwrap();
            let before = state.clone();

            prop_assert_eq!(state.create(h2, &s2), Err(TransitionError::AlreadyExists));
            prop_assert_eq!(state, before);
        }

        #[test]
        fn test_foreign_secret_not_owner(
            s1 in secret(),
            s2 in secret(),
            h1 in record_hash(),
            h2 in record_hash(),
        ) {
            prop_assume!(s1 != s2);

            let mut state = RecordState::new();
            state.create(h1, &s1).unwrap();
            let before = state.clone();

            prop_assert_eq!(state.update(h2, &s2), Err(TransitionError::NotOwner));
            prop_assert_eq!(state.delete(&s2), Err(TransitionError::NotOwner));
            prop_assert_eq!(state, before);
        }

        #[test]
        fn test_owner_update_keeps_token(
            s in secret(),
            h1 in record_hash(),
            h2 in record_hash(),
        ) {
            let mut state = RecordState::new();
            state.create(h1, &s).unwrap();
            let token = state.owner_token();

            state.update(h2, &s).unwrap();
            prop_assert_eq!(state.record_hash(), Some(h2));
            prop_assert_eq!(state.owner_token(), token);
        }

        #[test]
        fn test_recreate_mints_fresh_token(
            s in secret(),
            h1 in record_hash(),
            h2 in record_hash(),
        ) {
            let mut state = RecordState::new();
            state.create(h1, &s).unwrap();
            let first = state.owner_token();

            state.delete(&s).unwrap();
            state.create(h2, &s).unwrap();

            prop_assert_ne!(state.owner_token(), first);
            prop_assert_eq!(state.owner_token(), bind(&s, &Context::from_sequence(3)));
        }

        #[test]
        fn test_bind_distinct_contexts(s in secret(), a in sequence(), b in sequence()) {
            prop_assume!(a != b);
            prop_assert_ne!(
                bind(&s, &Context::from_sequence(a)),
                bind(&s, &Context::from_sequence(b))
            );
        }
    }
}
