//! Core types for tallyroot
//!
//! The entities committed into the authenticated maps, the authority's global
//! state, its event records and its configuration.

pub mod config;
pub mod events;
pub mod proposal;
pub mod signer;
pub mod state;

pub use config::{ConfigError, MultisigConfig};
pub use events::ContractEvent;
pub use proposal::{resolved_slot, Amount, Proposal, ProposalState, Votes};
pub use signer::{signer_key, SignerRecord};
pub use state::GlobalState;
