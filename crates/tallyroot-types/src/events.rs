//! Append-only observability records emitted by the authority

use crate::proposal::{Proposal, Votes};
use serde::{Deserialize, Serialize};
use tallyroot_crypto::PublicKey;
use tallyroot_store::MapKey;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContractEvent {
    /// Setup completed
    Init { num_signers: u64, threshold: u64 },

    /// A directly signed vote was applied
    Voted {
        signer: PublicKey,
        vote: bool,
        proposal: Proposal,
        index: MapKey,
    },

    /// A proof chain covering one or more votes was settled
    ChainSettled {
        proposal: Proposal,
        index: MapKey,
        votes: Votes,
        resolved: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = ContractEvent::Init {
            num_signers: 5,
            threshold: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"init","num_signers":5,"threshold":2}"#);
    }
}
