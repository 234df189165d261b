//! k-of-n multisig over authenticated sparse maps
//!
//! An authority keeps four committed fields: the signer roster root, the
//! proposal map root, the signer count and the threshold. Votes arrive either
//! one at a time with a signature ([`MultisigContract::approve_signature`]) or
//! batched behind a proof chain ([`MultisigContract::approve_with_proof`]).
//! Both paths share the transition in [`transition`].

pub mod client;
pub mod contract;
pub mod ledger;
pub mod proof;
pub mod transition;

pub use client::{PendingChain, ProposalBook, Roster};
pub use contract::{ApprovalRequest, MultisigContract, SettlementRequest};
pub use ledger::{Ledger, MemLedger};
pub use proof::{
    merge, merge_all, prove_step, verify, ChainStatement, MergeProof, StepBackend, StepProof,
    StepWitness, TransparentBackend, VoteProof,
};
pub use transition::{
    check_entry, record_vote, resolve, vote_transition, FeeContext, TransitionOutcome, VoteInput,
};
