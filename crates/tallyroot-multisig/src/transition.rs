//! The vote state transition
//!
//! A vote is applied in three stages that are shared by direct approvals and
//! by proof chains:
//!
//! 1. [`check_entry`] authenticates the claimed proposal state against the
//!    committed proposal root.
//! 2. [`record_vote`] consumes the signer's eligibility in the proposal's own
//!    signer map and bumps the tally. Proof-chain steps run only this stage.
//! 3. [`resolve`] evaluates the threshold, settles the account-creation fee
//!    and computes the proposal root after the update.
//!
//! Nothing here touches committed state; the caller commits the returned
//! [`TransitionOutcome`] only after every check has passed.

use serde::{Deserialize, Serialize};
use tallyroot_crypto::{Hash, PublicKey};
use tallyroot_errors::{Error, Result};
use tallyroot_store::{AuthenticatedMap, MapWitness, StoreError, EMPTY_VALUE};
use tallyroot_types::{
    resolved_slot, signer_key, Amount, GlobalState, ProposalState, SignerRecord,
};

/// Ledger facts that decide whether the account-creation fee applies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeContext {
    pub receiver_exists: bool,
    pub account_creation_fee: Amount,
}

/// One vote on one proposal, with the witnesses it needs
#[derive(Clone, Copy, Debug)]
pub struct VoteInput<'a> {
    pub proposal_state: &'a ProposalState,
    pub signer: &'a PublicKey,
    pub vote: bool,
    pub signer_witness: &'a MapWitness,
    pub proposal_witness: &'a MapWitness,
}

/// Result of applying votes to a proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// Proposal state after the votes, fee flag included
    pub state_after: ProposalState,
    /// Value written to the proposal's slot; the resolved marker once resolved
    pub slot_value: Hash,
    pub new_proposal_root: Hash,
    /// Amount owed to the receiver
    pub payout: Amount,
    /// Account-creation fee charged by this transition
    pub fee_charged: Amount,
    pub votes_reached: bool,
    pub rejected: bool,
}

impl TransitionOutcome {
    /// Whether the proposal reached a final decision
    pub fn resolved(&self) -> bool {
        self.votes_reached || self.rejected
    }

    /// Total debit on the authority's balance
    pub fn total_debit(&self) -> Result<Amount> {
        self.payout
            .checked_add(self.fee_charged)
            .ok_or(Error::Overflow)
    }
}

/// Authenticate `state` as the current content of its proposal slot.
///
/// A proposal with no votes may also be absent from the map, in which case
/// it must be forked from the current roster. Resolved slots hold
/// [`resolved_slot`], so neither form can target them.
pub fn check_entry<M: AuthenticatedMap>(
    map: &M,
    global: &GlobalState,
    state: &ProposalState,
    proposal_witness: &MapWitness,
) -> Result<()> {
    let is_new = state.can_be_new();
    if is_new && state.signer_state_root != global.signer_root {
        return Err(Error::InvariantViolation(
            "proposal without votes must use the current signer roster".to_string(),
        ));
    }

    let expected_slot = if is_new { EMPTY_VALUE } else { state.hash() };
    map.verify(
        &global.proposal_root,
        &state.index,
        proposal_witness,
        &expected_slot,
    )?;
    Ok(())
}

/// Spend `signer`'s eligibility on `state` and count `vote`.
///
/// Fails with [`Error::SignerNotEligible`] when the signer is not in the
/// proposal's signer map with an unused vote.
pub fn record_vote<M: AuthenticatedMap>(
    map: &M,
    state: &ProposalState,
    signer: &PublicKey,
    vote: bool,
    signer_witness: &MapWitness,
) -> Result<ProposalState> {
    let key = signer_key(signer);
    let eligible = SignerRecord::eligible(signer.clone()).hash();
    map.verify(&state.signer_state_root, &key, signer_witness, &eligible)
        .map_err(|err| match err {
            StoreError::RootMismatch { .. } => Error::SignerNotEligible,
            other => other.into(),
        })?;

    let voted = SignerRecord::voted(signer.clone()).hash();
    let signer_state_root = map.reroot(signer_witness, &key, &voted)?;
    let votes = state.votes.with_vote(vote).ok_or(Error::Overflow)?;

    Ok(ProposalState {
        votes,
        signer_state_root,
        ..state.clone()
    })
}

/// Evaluate the threshold on `state` and compute the resulting proposal root.
///
/// `state` is the proposal after its votes were recorded; `proposal_witness`
/// is the witness of its slot under the committed proposal root.
pub fn resolve<M: AuthenticatedMap>(
    map: &M,
    global: &GlobalState,
    mut state: ProposalState,
    proposal_witness: &MapWitness,
    fee: FeeContext,
) -> Result<TransitionOutcome> {
    let votes_reached = global.votes_reached(state.votes.votes_for);
    let rejected = global.rejected(state.votes.votes_against);

    let fee_charged = if !fee.receiver_exists && !state.account_creation_fee_paid {
        fee.account_creation_fee
    } else {
        0
    };
    state.account_creation_fee_paid |= fee_charged > 0;

    // Fee already paid on behalf of the receiver comes out of the payout.
    let payout = if votes_reached {
        let deducted = if state.account_creation_fee_paid {
            fee.account_creation_fee
        } else {
            0
        };
        state.proposal.amount.saturating_sub(deducted)
    } else {
        0
    };

    let slot_value = if votes_reached || rejected {
        resolved_slot(&state.index)
    } else {
        state.hash()
    };
    let new_proposal_root = map.reroot(proposal_witness, &state.index, &slot_value)?;

    Ok(TransitionOutcome {
        state_after: state,
        slot_value,
        new_proposal_root,
        payout,
        fee_charged,
        votes_reached,
        rejected,
    })
}

/// Apply a single vote: [`check_entry`], [`record_vote`], then [`resolve`]
pub fn vote_transition<M: AuthenticatedMap>(
    map: &M,
    global: &GlobalState,
    input: VoteInput<'_>,
    fee: FeeContext,
) -> Result<TransitionOutcome> {
    check_entry(map, global, input.proposal_state, input.proposal_witness)?;
    let after = record_vote(
        map,
        input.proposal_state,
        input.signer,
        input.vote,
        input.signer_witness,
    )?;
    resolve(map, global, after, input.proposal_witness, fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tallyroot_crypto::{Address, KeyKind, PrivateKey};
    use tallyroot_store::{MapKey, SparseMerkleMap, WitnessVerifier};
    use tallyroot_types::{Proposal, Votes};

    struct Fixture {
        keys: Vec<PublicKey>,
        global: GlobalState,
        proposals: SparseMerkleMap,
        signers: SparseMerkleMap,
        state: ProposalState,
    }

    impl Fixture {
        fn new(num_signers: u8, threshold: u64, amount: Amount) -> Self {
            let keys: Vec<PublicKey> = (1..=num_signers)
                .map(|i| {
                    PrivateKey::from_secret(KeyKind::Ed25519, &[i; 32])
                        .unwrap()
                        .public_key()
                })
                .collect();
            let roster = SparseMerkleMap::from_entries(keys.iter().map(|k| {
                let record = SignerRecord::eligible(k.clone());
                (record.map_key(), record.hash())
            }));
            let proposals = SparseMerkleMap::new();
            let global = GlobalState {
                signer_root: roster.root(),
                proposal_root: proposals.root(),
                num_signers: keys.len() as u64,
                threshold,
                version: 0,
            };
            let state = ProposalState::new(
                Proposal::new(amount, Address::from_bytes([9u8; 20])),
                MapKey::from(7u64),
                roster.root(),
            );
            Self {
                keys,
                signers: roster,
                global,
                proposals,
                state,
            }
        }

        fn vote(&mut self, signer: usize, vote: bool, fee: FeeContext) -> Result<TransitionOutcome> {
            let signer = self.keys[signer].clone();
            let signer_witness = self.signers.witness(&signer_key(&signer));
            let proposal_witness = self.proposals.witness(&self.state.index);
            let outcome = vote_transition(
                &WitnessVerifier,
                &self.global,
                VoteInput {
                    proposal_state: &self.state,
                    signer: &signer,
                    vote,
                    signer_witness: &signer_witness,
                    proposal_witness: &proposal_witness,
                },
                fee,
            )?;

            self.signers.set(
                signer_key(&signer),
                SignerRecord::voted(signer.clone()).hash(),
            );
            self.proposals.set(self.state.index, outcome.slot_value);
            assert_eq!(self.proposals.root(), outcome.new_proposal_root);
            assert_eq!(self.signers.root(), outcome.state_after.signer_state_root);
            self.global.proposal_root = outcome.new_proposal_root;
            self.state = outcome.state_after.clone();
            Ok(outcome)
        }
    }

    fn existing_receiver() -> FeeContext {
        FeeContext {
            receiver_exists: true,
            account_creation_fee: 10,
        }
    }

    #[test]
    fn test_first_vote_inserts_proposal() {
        let mut fx = Fixture::new(3, 2, 100);
        let outcome = fx.vote(0, true, existing_receiver()).unwrap();

        assert_eq!(outcome.state_after.votes, Votes::new(1, 0));
        assert!(!outcome.resolved());
        assert_eq!(outcome.payout, 0);
        assert_eq!(outcome.slot_value, outcome.state_after.hash());
        assert!(fx.proposals.contains(&fx.state.index));
    }

    #[test]
    fn test_threshold_resolves_and_pays() {
        let mut fx = Fixture::new(3, 2, 100);
        fx.vote(0, true, existing_receiver()).unwrap();
        let outcome = fx.vote(1, true, existing_receiver()).unwrap();

        assert!(outcome.votes_reached);
        assert_eq!(outcome.payout, 100);
        assert_eq!(outcome.slot_value, resolved_slot(&fx.state.index));
        assert_eq!(fx.proposals.get(&fx.state.index), resolved_slot(&fx.state.index));
    }

    #[test]
    fn test_resolved_index_cannot_be_entered_again() {
        let mut fx = Fixture::new(3, 2, 100);
        let fresh = fx.state.clone();
        fx.vote(0, true, existing_receiver()).unwrap();
        fx.vote(1, true, existing_receiver()).unwrap();

        let witness = fx.proposals.witness(&fresh.index);
        let err = check_entry(&WitnessVerifier, &fx.global, &fresh, &witness).unwrap_err();
        assert!(matches!(err, Error::StaleRoot { .. }));

        let err = check_entry(&WitnessVerifier, &fx.global, &fx.state, &witness).unwrap_err();
        assert!(matches!(err, Error::StaleRoot { .. }));
    }

    #[test]
    fn test_rejection_resolves_without_payout() {
        let mut fx = Fixture::new(3, 3, 100);
        let outcome = fx.vote(0, false, existing_receiver()).unwrap();

        assert!(outcome.rejected);
        assert!(!outcome.votes_reached);
        assert_eq!(outcome.payout, 0);
        assert_eq!(outcome.slot_value, resolved_slot(&fx.state.index));
    }

    #[test]
    fn test_double_vote_rejected() {
        let mut fx = Fixture::new(3, 3, 100);
        fx.vote(0, true, existing_receiver()).unwrap();
        let err = fx.vote(0, true, existing_receiver()).unwrap_err();
        assert_eq!(err, Error::SignerNotEligible);
    }

    #[test]
    fn test_outsider_rejected() {
        let fx = Fixture::new(3, 2, 100);
        let outsider = PrivateKey::from_secret(KeyKind::Ed25519, &[42u8; 32])
            .unwrap()
            .public_key();
        let witness = fx.signers.witness(&signer_key(&outsider));

        let err = record_vote(&WitnessVerifier, &fx.state, &outsider, true, &witness).unwrap_err();
        assert_eq!(err, Error::SignerNotEligible);
    }

    #[test]
    fn test_witness_for_other_signer_fails_closed() {
        let fx = Fixture::new(3, 2, 100);
        let wrong_witness = fx.signers.witness(&signer_key(&fx.keys[1]));

        let err =
            record_vote(&WitnessVerifier, &fx.state, &fx.keys[0], true, &wrong_witness).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { .. }));
    }

    #[test]
    fn test_fresh_proposal_must_fork_current_roster() {
        let fx = Fixture::new(3, 2, 100);
        let mut forged = fx.state.clone();
        forged.signer_state_root = [5u8; 32];
        let witness = fx.proposals.witness(&forged.index);

        let err = check_entry(&WitnessVerifier, &fx.global, &forged, &witness).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_stale_proposal_witness_rejected() {
        let mut fx = Fixture::new(3, 3, 100);
        fx.vote(0, true, existing_receiver()).unwrap();
        let stale = fx.proposals.witness(&fx.state.index);

        // An unrelated proposal changes the root after the witness was taken.
        fx.proposals.set(MapKey::from(8u64), [3u8; 32]);
        fx.global.proposal_root = fx.proposals.root();

        let err = check_entry(&WitnessVerifier, &fx.global, &fx.state, &stale).unwrap_err();
        assert!(matches!(err, Error::StaleRoot { .. }));
    }

    #[test]
    fn test_fee_charged_once() {
        let fee = FeeContext {
            receiver_exists: false,
            account_creation_fee: 10,
        };
        let mut fx = Fixture::new(5, 3, 100);

        let first = fx.vote(0, true, fee).unwrap();
        assert_eq!(first.fee_charged, 10);
        assert!(first.state_after.account_creation_fee_paid);

        // Receiver still reported missing, but the flag keeps the fee from
        // being charged a second time.
        let second = fx.vote(1, false, fee).unwrap();
        assert_eq!(second.fee_charged, 0);

        let third = fx.vote(2, true, fee).unwrap();
        assert_eq!(third.fee_charged, 0);
        let fourth = fx.vote(3, true, fee).unwrap();
        assert!(fourth.votes_reached);
        assert_eq!(fourth.payout, 90);
    }

    #[test]
    fn test_fee_larger_than_amount_pays_nothing() {
        let fee = FeeContext {
            receiver_exists: false,
            account_creation_fee: 500,
        };
        let mut fx = Fixture::new(1, 1, 100);
        let outcome = fx.vote(0, true, fee).unwrap();

        assert!(outcome.votes_reached);
        assert_eq!(outcome.fee_charged, 500);
        assert_eq!(outcome.payout, 0);
    }

    #[test]
    fn test_transition_is_deterministic() {
        let fx = Fixture::new(3, 2, 100);
        let signer_witness = fx.signers.witness(&signer_key(&fx.keys[2]));
        let proposal_witness = fx.proposals.witness(&fx.state.index);
        let input = VoteInput {
            proposal_state: &fx.state,
            signer: &fx.keys[2],
            vote: false,
            signer_witness: &signer_witness,
            proposal_witness: &proposal_witness,
        };

        let a = vote_transition(&WitnessVerifier, &fx.global, input, existing_receiver()).unwrap();
        let b = vote_transition(&WitnessVerifier, &fx.global, input, existing_receiver()).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_tallies_are_monotone_and_exclusive(
            num_signers in 1u8..6,
            threshold_seed in 0u64..6,
            votes in proptest::collection::vec(any::<bool>(), 1..6),
        ) {
            let threshold = threshold_seed % num_signers as u64 + 1;
            let mut fx = Fixture::new(num_signers, threshold, 100);
            let mut previous = Votes::default();

            for (signer, vote) in votes.into_iter().take(num_signers as usize).enumerate() {
                let outcome = fx.vote(signer, vote, existing_receiver()).unwrap();
                let tally = outcome.state_after.votes;

                prop_assert!(tally.votes_for >= previous.votes_for);
                prop_assert!(tally.votes_against >= previous.votes_against);
                prop_assert_eq!(
                    tally.votes_for + tally.votes_against,
                    previous.votes_for + previous.votes_against + 1
                );
                prop_assert!(!(outcome.votes_reached && outcome.rejected));
                previous = tally;

                if outcome.resolved() {
                    prop_assert_eq!(
                        fx.proposals.get(&fx.state.index),
                        resolved_slot(&fx.state.index)
                    );
                    break;
                }
            }
        }
    }
}
