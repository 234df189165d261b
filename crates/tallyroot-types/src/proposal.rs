//! Proposals and their committed voting state

use serde::{Deserialize, Serialize};
use tallyroot_crypto::{Address, FieldHasher, Hash};
use tallyroot_store::MapKey;

/// Token amount
pub type Amount = u64;

/// Action executed once the vote threshold is reached
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub amount: Amount,
    pub receiver: Address,
}

impl Proposal {
    pub fn new(amount: Amount, receiver: Address) -> Self {
        Self { amount, receiver }
    }

    pub fn hash(&self) -> Hash {
        FieldHasher::new("tallyroot/proposal")
            .u64(self.amount)
            .bytes(self.receiver.as_bytes())
            .finish()
    }
}

/// Vote tally of one proposal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votes {
    #[serde(rename = "for")]
    pub votes_for: u64,
    #[serde(rename = "against")]
    pub votes_against: u64,
}

impl Votes {
    pub fn new(votes_for: u64, votes_against: u64) -> Self {
        Self {
            votes_for,
            votes_against,
        }
    }

    /// No vote has been cast yet
    pub fn is_empty(&self) -> bool {
        self.votes_for == 0 && self.votes_against == 0
    }

    /// Tally with one more vote, `None` on overflow
    pub fn with_vote(self, vote: bool) -> Option<Self> {
        if vote {
            Some(Self {
                votes_for: self.votes_for.checked_add(1)?,
                ..self
            })
        } else {
            Some(Self {
                votes_against: self.votes_against.checked_add(1)?,
                ..self
            })
        }
    }
}

/// Committed state of a proposal, stored by digest in the proposal map
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalState {
    pub proposal: Proposal,
    /// Slot of this proposal in the proposal map
    pub index: MapKey,
    pub votes: Votes,
    /// Root of this proposal's own signer map
    pub signer_state_root: Hash,
    /// Set once the receiver's account-creation fee has been charged
    pub account_creation_fee_paid: bool,
}

impl ProposalState {
    /// Fresh state for a proposal that has not been voted on, forked from the
    /// current signer roster
    pub fn new(proposal: Proposal, index: MapKey, roster_root: Hash) -> Self {
        Self {
            proposal,
            index,
            votes: Votes::default(),
            signer_state_root: roster_root,
            account_creation_fee_paid: false,
        }
    }

    pub fn hash(&self) -> Hash {
        FieldHasher::new("tallyroot/proposal-state")
            .hash(&self.proposal.hash())
            .hash(self.index.as_bytes())
            .u64(self.votes.votes_for)
            .u64(self.votes.votes_against)
            .hash(&self.signer_state_root)
            .bool(self.account_creation_fee_paid)
            .finish()
    }

    /// Whether the proposal may still be absent from the proposal map
    pub fn can_be_new(&self) -> bool {
        self.votes.is_empty()
    }
}

/// Value left in a proposal slot once the proposal is resolved.
///
/// It differs from `EMPTY_VALUE` and from every state digest, so a resolved
/// index can neither be opened again nor voted on.
pub fn resolved_slot(index: &MapKey) -> Hash {
    FieldHasher::new("tallyroot/resolved")
        .hash(index.as_bytes())
        .finish()
}
