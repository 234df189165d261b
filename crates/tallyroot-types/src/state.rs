//! Authority-owned global state

use serde::{Deserialize, Serialize};
use tallyroot_crypto::{Hash, ZERO_HASH};

/// The four committed fields of the multisig, plus an update counter.
///
/// Only the authority holds a writable copy; everyone else learns the roots
/// from it and builds witnesses against them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Roster of all eligible signers
    pub signer_root: Hash,
    /// Root of the proposal map
    pub proposal_root: Hash,
    pub num_signers: u64,
    pub threshold: u64,
    /// Incremented on every committed update
    pub version: u64,
}

impl GlobalState {
    /// Whether any of the four committed fields has been set
    pub fn is_initialized(&self) -> bool {
        self.signer_root != ZERO_HASH
            || self.proposal_root != ZERO_HASH
            || self.num_signers != 0
            || self.threshold != 0
    }

    /// Largest number of against votes that still lets the threshold be
    /// reached; one more rejects the proposal
    pub fn rejection_bound(&self) -> u64 {
        self.num_signers.saturating_sub(self.threshold)
    }

    /// Whether `votes_for` meets the threshold
    pub fn votes_reached(&self, votes_for: u64) -> bool {
        votes_for >= self.threshold
    }

    /// Whether `votes_against` makes the threshold unreachable
    pub fn rejected(&self, votes_against: u64) -> bool {
        votes_against > self.rejection_bound()
    }
}
