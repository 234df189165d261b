//! Proof chains over vote steps
//!
//! A [`VoteProof`] attests that one proposal state evolves into another
//! through a sequence of valid votes. Leaves are single [`StepProof`]s
//! produced by a [`StepBackend`]; adjacent proofs are combined with
//! [`merge`] so that any number of votes settles in one submission.
//!
//! The proving system behind a step is pluggable. [`TransparentBackend`]
//! ships the private step inputs in the seal and re-executes the step on
//! verification: it binds the same statement a succinct backend would, but
//! reveals who voted and how.

use serde::{Deserialize, Serialize};
use tallyroot_crypto::{sign_message, verify_signature, FieldHasher, Hash, PrivateKey, PublicKey};
use tallyroot_errors::{Error, Result};
use tallyroot_store::{MapWitness, WitnessVerifier};
use tallyroot_types::ProposalState;
use tracing::debug;

use crate::transition::record_vote;

/// Public claim of a proof: the proposal state digest before and after
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatement {
    pub from_proposal_hash: Hash,
    pub to_proposal_hash: Hash,
}

impl ChainStatement {
    pub fn new(from_proposal_hash: Hash, to_proposal_hash: Hash) -> Self {
        Self {
            from_proposal_hash,
            to_proposal_hash,
        }
    }

    /// Statement spanning `from` to `to`
    pub fn between(from: &ProposalState, to: &ProposalState) -> Self {
        Self::new(from.hash(), to.hash())
    }

    /// Digest a step signer authorizes
    pub fn digest(&self) -> Hash {
        FieldHasher::new("tallyroot/chain-statement")
            .hash(&self.from_proposal_hash)
            .hash(&self.to_proposal_hash)
            .finish()
    }
}

/// Private inputs of one vote step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWitness {
    pub proposal_state: ProposalState,
    pub signer: PublicKey,
    pub vote: bool,
    pub signer_witness: MapWitness,
}

/// Proving system for single vote steps.
///
/// A valid seal for `statement` must imply that some eligible signer, with
/// an unused vote in the `from` state's signer map, authorized exactly the
/// transition to the `to` state.
pub trait StepBackend {
    /// Identifier recorded in every step proof this backend produces
    fn id(&self) -> &str;

    /// Produce a seal for `statement` from the step's private inputs
    fn prove(
        &self,
        statement: &ChainStatement,
        signer: &PrivateKey,
        witness: &StepWitness,
    ) -> Result<Vec<u8>>;

    /// Check `seal` against `statement`
    fn verify(&self, statement: &ChainStatement, seal: &[u8]) -> Result<()>;
}

/// Leaf proof covering one vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProof {
    pub statement: ChainStatement,
    pub backend_id: String,
    pub seal: Vec<u8>,
}

/// Two adjacent proofs combined
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeProof {
    pub statement: ChainStatement,
    pub left: Box<VoteProof>,
    pub right: Box<VoteProof>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteProof {
    Step(StepProof),
    Merge(MergeProof),
}

impl VoteProof {
    pub fn statement(&self) -> &ChainStatement {
        match self {
            VoteProof::Step(step) => &step.statement,
            VoteProof::Merge(merged) => &merged.statement,
        }
    }

    /// Number of votes covered
    pub fn step_count(&self) -> usize {
        match self {
            VoteProof::Step(_) => 1,
            VoteProof::Merge(merged) => merged.left.step_count() + merged.right.step_count(),
        }
    }
}

/// Prove one vote by `signer` on `state`.
///
/// Returns the proof together with the state it leads to, so the caller can
/// chain the next step from it.
pub fn prove_step<B: StepBackend>(
    backend: &B,
    signer: &PrivateKey,
    state: &ProposalState,
    vote: bool,
    signer_witness: &MapWitness,
) -> Result<(VoteProof, ProposalState)> {
    let pubkey = signer.public_key();
    let after = record_vote(&WitnessVerifier, state, &pubkey, vote, signer_witness)?;
    let statement = ChainStatement::between(state, &after);

    let witness = StepWitness {
        proposal_state: state.clone(),
        signer: pubkey,
        vote,
        signer_witness: signer_witness.clone(),
    };
    let seal = backend.prove(&statement, signer, &witness)?;
    debug!(
        backend = backend.id(),
        votes_for = after.votes.votes_for,
        votes_against = after.votes.votes_against,
        "vote step proved"
    );

    let proof = VoteProof::Step(StepProof {
        statement,
        backend_id: backend.id().to_string(),
        seal,
    });
    Ok((proof, after))
}

/// Combine `left` and `right` into one proof spanning both.
///
/// Both inputs are verified; `left` must end where `right` starts.
pub fn merge<B: StepBackend>(backend: &B, left: VoteProof, right: VoteProof) -> Result<VoteProof> {
    let (l, r) = (*left.statement(), *right.statement());
    if l.to_proposal_hash != r.from_proposal_hash {
        return Err(Error::ChainMismatch(
            "left proof does not end where right proof starts".to_string(),
        ));
    }
    verify(backend, &left)?;
    verify(backend, &right)?;

    Ok(VoteProof::Merge(MergeProof {
        statement: ChainStatement::new(l.from_proposal_hash, r.to_proposal_hash),
        left: Box::new(left),
        right: Box::new(right),
    }))
}

/// Merge an ordered run of adjacent proofs into one.
///
/// Proofs are merged pairwise level by level, which keeps the proof tree
/// balanced.
pub fn merge_all<B: StepBackend>(backend: &B, proofs: Vec<VoteProof>) -> Result<VoteProof> {
    if proofs.is_empty() {
        return Err(Error::InvalidRequest("no proofs to merge".to_string()));
    }

    let mut level = proofs;
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut iter = level.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next.push(merge(backend, left, right)?),
                None => next.push(left),
            }
        }
        level = next;
    }

    level
        .pop()
        .ok_or_else(|| Error::InvalidRequest("no proofs to merge".to_string()))
}

/// Verify `proof` and every proof it was merged from
pub fn verify<B: StepBackend>(backend: &B, proof: &VoteProof) -> Result<()> {
    match proof {
        VoteProof::Step(step) => {
            if step.backend_id != backend.id() {
                return Err(Error::InvalidProof(format!(
                    "proof from backend {}, expected {}",
                    step.backend_id,
                    backend.id()
                )));
            }
            backend.verify(&step.statement, &step.seal)
        }
        VoteProof::Merge(merged) => {
            let (l, r) = (merged.left.statement(), merged.right.statement());
            if l.to_proposal_hash != r.from_proposal_hash {
                return Err(Error::InvalidProof(
                    "merged proofs are not adjacent".to_string(),
                ));
            }
            if merged.statement != ChainStatement::new(l.from_proposal_hash, r.to_proposal_hash) {
                return Err(Error::InvalidProof(
                    "merge statement does not span its children".to_string(),
                ));
            }
            verify(backend, &merged.left)?;
            verify(backend, &merged.right)
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TransparentSeal {
    witness: StepWitness,
    signature: Vec<u8>,
}

/// Step backend that re-executes the vote step from the seal
#[derive(Debug, Default, Clone, Copy)]
pub struct TransparentBackend;

impl TransparentBackend {
    pub const ID: &'static str = "tallyroot-transparent-v1";
}

impl StepBackend for TransparentBackend {
    fn id(&self) -> &str {
        Self::ID
    }

    fn prove(
        &self,
        statement: &ChainStatement,
        signer: &PrivateKey,
        witness: &StepWitness,
    ) -> Result<Vec<u8>> {
        if signer.public_key() != witness.signer {
            return Err(Error::InvalidRequest(
                "signing key does not match the step signer".to_string(),
            ));
        }
        let signature =
            sign_message(signer, &statement.digest()).map_err(|_| Error::InvalidSignature)?;
        let seal = TransparentSeal {
            witness: witness.clone(),
            signature,
        };
        serde_json::to_vec(&seal).map_err(|e| Error::InvalidRequest(format!("seal encoding:: {e}")))
    }

    fn verify(&self, statement: &ChainStatement, seal: &[u8]) -> Result<()> {
        let seal: TransparentSeal = serde_json::from_slice(seal)
            .map_err(|e| Error::InvalidProof(format!("undecodable seal:: {e}")))?;
        let witness = &seal.witness;

        if witness.proposal_state.hash() != statement.from_proposal_hash {
            return Err(Error::InvalidProof(
                "step does not start from the claimed proposal state".to_string(),
            ));
        }
        verify_signature(&witness.signer, &statement.digest(), &seal.signature)
            .map_err(|_| Error::InvalidSignature)?;

        let after = record_vote(
            &WitnessVerifier,
            &witness.proposal_state,
            &witness.signer,
            witness.vote,
            &witness.signer_witness,
        )
        .map_err(|e| Error::InvalidProof(format!("step not valid:: {e}")))?;
        if after.hash() != statement.to_proposal_hash {
            return Err(Error::InvalidProof(
                "step does not reach the claimed proposal state".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyroot_crypto::{Address, KeyKind};
    use tallyroot_store::{MapKey, SparseMerkleMap};
    use tallyroot_types::{signer_key, Proposal, SignerRecord, Votes};

    struct Chain {
        keys: Vec<PrivateKey>,
        signers: SparseMerkleMap,
        start: ProposalState,
        state: ProposalState,
    }

    impl Chain {
        fn new(num_signers: u8) -> Self {
            let keys: Vec<PrivateKey> = (1..=num_signers)
                .map(|i| PrivateKey::from_secret(KeyKind::Secp256k1, &[i; 32]).unwrap())
                .collect();
            let signers = SparseMerkleMap::from_entries(keys.iter().map(|k| {
                let record = SignerRecord::eligible(k.public_key());
                (record.map_key(), record.hash())
            }));
            let start = ProposalState::new(
                Proposal::new(100, Address::from_bytes([3u8; 20])),
                MapKey::from(1u64),
                signers.root(),
            );
            Self {
                keys,
                signers,
                state: start.clone(),
                start,
            }
        }

        fn step(&mut self, signer: usize, vote: bool) -> Result<VoteProof> {
            let key = &self.keys[signer];
            let witness = self.signers.witness(&signer_key(&key.public_key()));
            let (proof, after) = prove_step(&TransparentBackend, key, &self.state, vote, &witness)?;
            self.signers.set(
                signer_key(&key.public_key()),
                SignerRecord::voted(key.public_key()).hash(),
            );
            self.state = after;
            Ok(proof)
        }
    }

    #[test]
    fn test_single_step_verifies() {
        let mut chain = Chain::new(3);
        let proof = chain.step(0, true).unwrap();

        verify(&TransparentBackend, &proof).unwrap();
        assert_eq!(proof.statement().from_proposal_hash, chain.start.hash());
        assert_eq!(proof.statement().to_proposal_hash, chain.state.hash());
        assert_eq!(chain.state.votes, Votes::new(1, 0));
    }

    #[test]
    fn test_merge_all_spans_chain() {
        let mut chain = Chain::new(5);
        let proofs = vec![
            chain.step(0, true).unwrap(),
            chain.step(1, false).unwrap(),
            chain.step(2, true).unwrap(),
            chain.step(3, true).unwrap(),
            chain.step(4, false).unwrap(),
        ];

        let merged = merge_all(&TransparentBackend, proofs).unwrap();
        verify(&TransparentBackend, &merged).unwrap();
        assert_eq!(merged.step_count(), 5);
        assert_eq!(
            *merged.statement(),
            ChainStatement::between(&chain.start, &chain.state)
        );
        assert_eq!(chain.state.votes, Votes::new(3, 2));
    }

    #[test]
    fn test_merge_rejects_non_adjacent() {
        let mut chain = Chain::new(3);
        let first = chain.step(0, true).unwrap();
        let _skipped = chain.step(1, true).unwrap();
        let third = chain.step(2, true).unwrap();

        let err = merge(&TransparentBackend, first, third).unwrap_err();
        assert!(matches!(err, Error::ChainMismatch(_)));
    }

    #[test]
    fn test_merge_all_rejects_empty() {
        assert!(merge_all(&TransparentBackend, Vec::new()).is_err());
    }

    #[test]
    fn test_forged_merge_statement_rejected() {
        let mut chain = Chain::new(3);
        let a = chain.step(0, true).unwrap();
        let b = chain.step(1, true).unwrap();
        let mut merged = merge(&TransparentBackend, a, b).unwrap();

        if let VoteProof::Merge(inner) = &mut merged {
            inner.statement.to_proposal_hash = [7u8; 32];
        }
        let err = verify(&TransparentBackend, &merged).unwrap_err();
        assert!(matches!(err, Error::InvalidProof(_)));
    }

    #[test]
    fn test_merge_rejects_invalid_child() {
        let mut chain = Chain::new(3);
        let a = chain.step(0, true).unwrap();
        let b = chain.step(1, true).unwrap();
        let (VoteProof::Step(left), VoteProof::Step(right)) = (&a, &b) else {
            panic!("steps expected");
        };

        // Each child keeps its statement but carries the other's seal.
        let mut bad_left = left.clone();
        bad_left.seal = right.seal.clone();
        let err = merge(&TransparentBackend, VoteProof::Step(bad_left), b.clone()).unwrap_err();
        assert!(matches!(err, Error::InvalidProof(_) | Error::InvalidSignature));

        let mut bad_right = right.clone();
        bad_right.seal = left.seal.clone();
        let err = merge(&TransparentBackend, a.clone(), VoteProof::Step(bad_right)).unwrap_err();
        assert!(matches!(err, Error::InvalidProof(_) | Error::InvalidSignature));

        merge(&TransparentBackend, a, b).unwrap();
    }

    #[test]
    fn test_rewritten_step_statement_rejected() {
        let mut chain = Chain::new(3);
        let mut proof = chain.step(0, true).unwrap();

        if let VoteProof::Step(step) = &mut proof {
            step.statement.to_proposal_hash = [7u8; 32];
        }
        assert!(verify(&TransparentBackend, &proof).is_err());
    }

    #[test]
    fn test_garbage_seal_rejected() {
        let mut chain = Chain::new(3);
        let mut proof = chain.step(0, true).unwrap();

        if let VoteProof::Step(step) = &mut proof {
            step.seal = b"not a seal".to_vec();
        }
        let err = verify(&TransparentBackend, &proof).unwrap_err();
        assert!(matches!(err, Error::InvalidProof(_)));
    }

    #[test]
    fn test_foreign_backend_id_rejected() {
        let mut chain = Chain::new(3);
        let mut proof = chain.step(0, true).unwrap();

        if let VoteProof::Step(step) = &mut proof {
            step.backend_id = "other".to_string();
        }
        assert!(verify(&TransparentBackend, &proof).is_err());
    }

    #[test]
    fn test_double_vote_cannot_be_proved() {
        let mut chain = Chain::new(3);
        chain.step(0, true).unwrap();
        let err = chain.step(0, false).unwrap_err();
        assert_eq!(err, Error::SignerNotEligible);
    }

    #[test]
    fn test_proof_serializes() {
        let mut chain = Chain::new(2);
        let a = chain.step(0, true).unwrap();
        let b = chain.step(1, true).unwrap();
        let merged = merge(&TransparentBackend, a, b).unwrap();

        let json = serde_json::to_string(&merged).unwrap();
        let decoded: VoteProof = serde_json::from_str(&json).unwrap();
        verify(&TransparentBackend, &decoded).unwrap();
    }
}
