//! Off-authority bookkeeping
//!
//! The authority only keeps roots. Whoever submits votes has to hold the full
//! maps to produce witnesses: the signer roster, the proposal map, and one
//! signer map per open proposal. [`ProposalBook`] keeps those in step with
//! the authority by replaying every committed outcome.

use std::collections::BTreeMap;

use tallyroot_crypto::{sign_vote, to_hex, Hash, PrivateKey, PublicKey};
use tallyroot_errors::{Error, Result};
use tallyroot_store::{MapKey, MapWitness, SparseMerkleMap};
use tallyroot_types::{signer_key, Proposal, ProposalState, SignerRecord};
use tracing::debug;

use crate::contract::{ApprovalRequest, SettlementRequest};
use crate::proof::{merge_all, prove_step, StepBackend, VoteProof};
use crate::transition::TransitionOutcome;

/// The set of eligible signers and its map
#[derive(Clone, Debug)]
pub struct Roster {
    map: SparseMerkleMap,
}

impl Roster {
    /// Build a roster where every signer holds one unused vote
    pub fn new<I: IntoIterator<Item = PublicKey>>(signers: I) -> Result<Self> {
        let mut map = SparseMerkleMap::new();
        for signer in signers {
            let record = SignerRecord::eligible(signer);
            if map.contains(&record.map_key()) {
                return Err(Error::InvalidRequest(format!(
                    "duplicate signer {}",
                    record.map_key()
                )));
            }
            map.set(record.map_key(), record.hash());
        }
        Ok(Self { map })
    }

    pub fn root(&self) -> Hash {
        self.map.root()
    }

    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, pubkey: &PublicKey) -> bool {
        self.map.contains(&signer_key(pubkey))
    }

    pub fn map(&self) -> &SparseMerkleMap {
        &self.map
    }
}

#[derive(Clone, Debug)]
struct OpenProposal {
    state: ProposalState,
    signers: SparseMerkleMap,
}

/// Client-side mirror of the proposal map and the per-proposal signer maps
#[derive(Clone, Debug)]
pub struct ProposalBook {
    roster: Roster,
    proposals: SparseMerkleMap,
    open: BTreeMap<MapKey, OpenProposal>,
}

impl ProposalBook {
    pub fn new(roster: Roster) -> Self {
        Self {
            roster,
            proposals: SparseMerkleMap::new(),
            open: BTreeMap::new(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Root of the mirrored proposal map
    pub fn root(&self) -> Hash {
        self.proposals.root()
    }

    pub fn state(&self, index: &MapKey) -> Option<&ProposalState> {
        self.open.get(index).map(|open| &open.state)
    }

    pub fn is_open(&self, index: &MapKey) -> bool {
        self.open.contains_key(index)
    }

    /// Witness of `index` under the mirrored proposal root
    pub fn witness(&self, index: &MapKey) -> MapWitness {
        self.proposals.witness(index)
    }

    /// Start tracking `proposal` at `index`.
    ///
    /// The proposal map is unchanged until its first vote is committed.
    pub fn open(&mut self, proposal: Proposal, index: MapKey) -> Result<ProposalState> {
        if self.open.contains_key(&index) || self.proposals.contains(&index) {
            return Err(Error::InvalidRequest(format!("proposal index {index} in use")));
        }
        let state = ProposalState::new(proposal, index, self.roster.root());
        self.open.insert(
            index,
            OpenProposal {
                state: state.clone(),
                signers: self.roster.map().clone(),
            },
        );
        Ok(state)
    }

    /// Build a signed direct approval for the proposal at `index`
    pub fn prepare_approval(
        &self,
        index: &MapKey,
        key: &PrivateKey,
        vote: bool,
    ) -> Result<ApprovalRequest> {
        let open = self.lookup(index)?;
        let signer = key.public_key();
        let signature =
            sign_vote(key, &open.state.hash(), vote).map_err(|_| Error::InvalidSignature)?;

        Ok(ApprovalRequest {
            signer_witness: open.signers.witness(&signer_key(&signer)),
            signer,
            signature,
            vote,
            proposal_state: open.state.clone(),
            proposal_witness: self.proposals.witness(index),
        })
    }

    /// Replay a committed direct approval
    pub fn apply_approval(
        &mut self,
        request: &ApprovalRequest,
        outcome: &TransitionOutcome,
    ) -> Result<()> {
        let index = request.proposal_state.index;
        let mut signers = self.lookup(&index)?.signers.clone();
        signers.set(
            signer_key(&request.signer),
            SignerRecord::voted(request.signer.clone()).hash(),
        );
        self.commit(index, signers, outcome)
    }

    /// Start collecting proved votes on the proposal at `index`
    pub fn begin_chain(&self, index: &MapKey) -> Result<PendingChain> {
        let open = self.lookup(index)?;
        Ok(PendingChain {
            index: *index,
            from_state: open.state.clone(),
            current: open.state.clone(),
            signers: open.signers.clone(),
            proofs: Vec::new(),
        })
    }

    /// Replay a committed chain settlement
    pub fn apply_settlement(&mut self, chain: PendingChain, outcome: &TransitionOutcome) -> Result<()> {
        self.commit(chain.index, chain.signers, outcome)
    }

    fn lookup(&self, index: &MapKey) -> Result<&OpenProposal> {
        self.open
            .get(index)
            .ok_or_else(|| Error::InvalidRequest(format!("proposal index {index} not open")))
    }

    fn commit(
        &mut self,
        index: MapKey,
        signers: SparseMerkleMap,
        outcome: &TransitionOutcome,
    ) -> Result<()> {
        if signers.root() != outcome.state_after.signer_state_root {
            return Err(Error::StaleRoot {
                expected: to_hex(&outcome.state_after.signer_state_root),
                actual: to_hex(&signers.root()),
            });
        }

        let previous = self.proposals.get(&index);
        let root = self.proposals.set(index, outcome.slot_value);
        if root != outcome.new_proposal_root {
            self.proposals.set(index, previous);
            return Err(Error::StaleRoot {
                expected: to_hex(&outcome.new_proposal_root),
                actual: to_hex(&root),
            });
        }

        if outcome.resolved() {
            self.open.remove(&index);
            debug!(%index, "proposal closed");
        } else {
            self.open.insert(
                index,
                OpenProposal {
                    state: outcome.state_after.clone(),
                    signers,
                },
            );
        }
        Ok(())
    }
}

/// Votes proved off-authority on one proposal, not yet settled
#[derive(Clone, Debug)]
pub struct PendingChain {
    index: MapKey,
    from_state: ProposalState,
    current: ProposalState,
    signers: SparseMerkleMap,
    proofs: Vec<VoteProof>,
}

impl PendingChain {
    /// Prove `key`'s vote on top of the votes collected so far
    pub fn add_vote<B: StepBackend>(&mut self, backend: &B, key: &PrivateKey, vote: bool) -> Result<()> {
        let signer = key.public_key();
        let slot = signer_key(&signer);
        let witness = self.signers.witness(&slot);

        let (proof, after) = prove_step(backend, key, &self.current, vote, &witness)?;
        self.signers.set(slot, SignerRecord::voted(signer).hash());
        self.current = after;
        self.proofs.push(proof);
        Ok(())
    }

    /// State the collected votes lead to
    pub fn current(&self) -> &ProposalState {
        &self.current
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// Merge the collected proofs into a settlement against `book`'s root
    pub fn settlement<B: StepBackend>(
        &self,
        backend: &B,
        book: &ProposalBook,
    ) -> Result<SettlementRequest> {
        let proof = merge_all(backend, self.proofs.clone())?;
        Ok(SettlementRequest {
            proof,
            from_state: self.from_state.clone(),
            to_state: self.current.clone(),
            proposal_witness: book.witness(&self.index),
        })
    }
}
