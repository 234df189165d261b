//! The root-holding authority
//!
//! [`MultisigContract`] owns the committed [`GlobalState`] and is the only
//! party that advances it. Every entry point validates the full submission
//! first and only then disburses funds, commits the new proposal root and
//! records an event. A rejected submission leaves no trace.

use serde::{Deserialize, Serialize};
use tallyroot_crypto::{short_hex, verify_vote, Address, Hash, PublicKey};
use tallyroot_errors::{Error, Result};
use tallyroot_store::{MapWitness, WitnessVerifier};
use tallyroot_types::{ContractEvent, GlobalState, MultisigConfig, ProposalState};
use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::proof::{self, ChainStatement, StepBackend, VoteProof};
use crate::transition::{check_entry, resolve, vote_transition, FeeContext, TransitionOutcome, VoteInput};

/// A single vote signed by its signer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub signer: PublicKey,
    /// Signature over `(proposal_state.hash(), vote)`
    pub signature: Vec<u8>,
    pub vote: bool,
    pub proposal_state: ProposalState,
    pub proposal_witness: MapWitness,
    pub signer_witness: MapWitness,
}

/// A batch of votes attested by a proof chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub proof: VoteProof,
    /// Proposal state the chain starts from, as currently committed
    pub from_state: ProposalState,
    /// Proposal state the chain ends in
    pub to_state: ProposalState,
    pub proposal_witness: MapWitness,
}

pub struct MultisigContract<L: Ledger> {
    address: Address,
    config: MultisigConfig,
    ledger: L,
    state: GlobalState,
    events: Vec<ContractEvent>,
}

impl<L: Ledger> MultisigContract<L> {
    /// Uninitialized authority paying out of `address` on `ledger`
    pub fn new(address: Address, ledger: L, config: MultisigConfig) -> Self {
        Self {
            address,
            config,
            ledger,
            state: GlobalState::default(),
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn state(&self) -> &GlobalState {
        &self.state
    }

    pub fn config(&self) -> &MultisigConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Drain the recorded events
    pub fn take_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    /// One-time initialization of the four committed fields
    pub fn setup(
        &mut self,
        signer_root: Hash,
        proposal_root: Hash,
        num_signers: u64,
        threshold: u64,
    ) -> Result<()> {
        if self.state.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }
        if threshold == 0 || threshold > num_signers {
            return Err(Error::InvalidRequest(format!(
                "threshold {threshold} out of range for {num_signers} signers"
            )));
        }

        self.state = GlobalState {
            signer_root,
            proposal_root,
            num_signers,
            threshold,
            version: self.state.version.saturating_add(1),
        };
        self.events.push(ContractEvent::Init {
            num_signers,
            threshold,
        });
        info!(
            vault = %self.render(&self.address),
            num_signers,
            threshold,
            signer_root = %short_hex(&signer_root),
            "multisig initialized"
        );
        Ok(())
    }

    /// Apply one directly signed vote
    pub fn approve_signature(&mut self, request: &ApprovalRequest) -> Result<TransitionOutcome> {
        self.try_approve_signature(request).map_err(|err| {
            warn!(
                index = %request.proposal_state.index,
                code = err.code(),
                error = %err,
                "approval rejected"
            );
            err
        })
    }

    /// Settle every vote covered by a proof chain in one update
    pub fn approve_with_proof<B: StepBackend>(
        &mut self,
        backend: &B,
        request: &SettlementRequest,
    ) -> Result<TransitionOutcome> {
        self.try_approve_with_proof(backend, request).map_err(|err| {
            warn!(
                index = %request.from_state.index,
                code = err.code(),
                error = %err,
                "settlement rejected"
            );
            err
        })
    }

    fn try_approve_signature(&mut self, request: &ApprovalRequest) -> Result<TransitionOutcome> {
        self.ensure_initialized()?;
        verify_vote(
            &request.signer,
            &request.proposal_state.hash(),
            request.vote,
            &request.signature,
        )
        .map_err(|_| Error::InvalidSignature)?;

        let fee = self.fee_context(&request.proposal_state.proposal.receiver);
        let outcome = vote_transition(
            &WitnessVerifier,
            &self.state,
            VoteInput {
                proposal_state: &request.proposal_state,
                signer: &request.signer,
                vote: request.vote,
                signer_witness: &request.signer_witness,
                proposal_witness: &request.proposal_witness,
            },
            fee,
        )?;

        self.disburse(&outcome)?;
        self.commit(&outcome);
        debug!(
            signer = %self.render(&request.signer.to_address()),
            vote = request.vote,
            "signed vote applied"
        );
        self.events.push(ContractEvent::Voted {
            signer: request.signer.clone(),
            vote: request.vote,
            proposal: outcome.state_after.proposal.clone(),
            index: outcome.state_after.index,
        });
        Ok(outcome)
    }

    fn try_approve_with_proof<B: StepBackend>(
        &mut self,
        backend: &B,
        request: &SettlementRequest,
    ) -> Result<TransitionOutcome> {
        self.ensure_initialized()?;
        let (from, to) = (&request.from_state, &request.to_state);

        check_entry(&WitnessVerifier, &self.state, from, &request.proposal_witness)?;
        if to.index != from.index || to.proposal != from.proposal {
            return Err(Error::ProposalMismatch(
                "chain must start and end on the same proposal".to_string(),
            ));
        }
        if *request.proof.statement() != ChainStatement::between(from, to) {
            return Err(Error::InvalidProof(
                "proof does not span the submitted states".to_string(),
            ));
        }
        proof::verify(backend, &request.proof)?;
        debug!(steps = request.proof.step_count(), "proof chain verified");

        let fee = self.fee_context(&to.proposal.receiver);
        let outcome = resolve(
            &WitnessVerifier,
            &self.state,
            to.clone(),
            &request.proposal_witness,
            fee,
        )?;

        self.disburse(&outcome)?;
        self.commit(&outcome);
        self.events.push(ContractEvent::ChainSettled {
            proposal: outcome.state_after.proposal.clone(),
            index: outcome.state_after.index,
            votes: outcome.state_after.votes,
            resolved: outcome.resolved(),
        });
        Ok(outcome)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.state.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn fee_context(&self, receiver: &Address) -> FeeContext {
        FeeContext {
            receiver_exists: self.ledger.account_exists(receiver),
            account_creation_fee: self.config.account_creation_fee,
        }
    }

    /// Move the funds `outcome` owes in one all-or-nothing ledger call
    fn disburse(&mut self, outcome: &TransitionOutcome) -> Result<()> {
        let needed = outcome.total_debit()?;
        let available = self.ledger.balance(&self.address);
        if available < needed {
            return Err(Error::InsufficientFunds { needed, available });
        }

        self.ledger.disburse(
            &self.address,
            &outcome.state_after.proposal.receiver,
            outcome.fee_charged,
            outcome.payout,
        )
    }

    /// Address in the configured bech32 prefix, for logs
    fn render(&self, address: &Address) -> String {
        self.config
            .render_address(address)
            .unwrap_or_else(|_| address.to_string())
    }

    fn commit(&mut self, outcome: &TransitionOutcome) {
        self.state.proposal_root = outcome.new_proposal_root;
        self.state.version = self.state.version.saturating_add(1);

        let votes = outcome.state_after.votes;
        info!(
            index = %outcome.state_after.index,
            receiver = %self.render(&outcome.state_after.proposal.receiver),
            votes_for = votes.votes_for,
            votes_against = votes.votes_against,
            resolved = outcome.resolved(),
            payout = outcome.payout,
            fee = outcome.fee_charged,
            version = self.state.version,
            "proposal root committed"
        );
    }
}
