//! Error handling types for the tallyroot multisig protocol.
//!
//! Every rejection carries a reason string and belongs to one
//! [`ErrorKind`]. Rejections are produced before any side effect, so an
//! error always means the submission had no effect on committed state.

use thiserror::Error;

/// Core error type for tallyroot operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Signature does not verify under the claimed signer key
    #[error("unauthorized:: signature not valid")]
    InvalidSignature,

    /// Proof chain failed verification
    #[error("unauthorized:: invalid proof:: {0}")]
    InvalidProof(String),

    /// Signer is absent from the roster or has already voted
    #[error("unauthorized:: already voted or not an eligible signer")]
    SignerNotEligible,

    /// Witness recomputed a root other than the committed one
    #[error("stale root:: expected {expected}, got {actual}")]
    StaleRoot { expected: String, actual: String },

    /// Witness authenticates a different key than requested
    #[error("key mismatch:: witness authenticates {actual}, expected {expected}")]
    KeyMismatch { expected: String, actual: String },

    /// Witness has the wrong shape
    #[error("malformed witness:: {0}")]
    MalformedWitness(String),

    /// Proposal states in a request do not describe the same proposal
    #[error("proposal mismatch:: {0}")]
    ProposalMismatch(String),

    /// Proofs cannot be chained
    #[error("chain mismatch:: {0}")]
    ChainMismatch(String),

    /// Claimed proposal state contradicts the committed roster
    #[error("invariant violation:: {0}")]
    InvariantViolation(String),

    /// Setup was already performed
    #[error("invalid request:: already initialized")]
    AlreadyInitialized,

    /// Operation requires setup first
    #[error("invalid request:: not initialized")]
    NotInitialized,

    /// Malformed request parameters
    #[error("invalid request:: {0}")]
    InvalidRequest(String),

    /// Counter arithmetic overflowed
    #[error("invalid request:: arithmetic overflow")]
    Overflow,

    /// Disbursing account cannot cover the side effects
    #[error("insufficient funds:: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },
}

/// Coarse classification used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad signature, bad proof, ineligible or repeat signer
    Authorization,
    /// Stale or mismatched inputs; refetch roots and witnesses, then retry
    Consistency,
    /// Forged or stale proposal state; handled like an authorization failure
    Invariant,
    /// Malformed or out-of-order request
    Request,
    /// Ledger cannot fund the side effects
    Funds,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidSignature | Error::InvalidProof(_) | Error::SignerNotEligible => {
                ErrorKind::Authorization
            }
            Error::StaleRoot { .. }
            | Error::KeyMismatch { .. }
            | Error::MalformedWitness(_)
            | Error::ProposalMismatch(_)
            | Error::ChainMismatch(_) => ErrorKind::Consistency,
            Error::InvariantViolation(_) => ErrorKind::Invariant,
            Error::AlreadyInitialized
            | Error::NotInitialized
            | Error::InvalidRequest(_)
            | Error::Overflow => ErrorKind::Request,
            Error::InsufficientFunds { .. } => ErrorKind::Funds,
        }
    }

    /// Numeric error code, stable across releases
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidSignature => codes::INVALID_SIGNATURE,
            Error::InvalidProof(_) => codes::INVALID_PROOF,
            Error::SignerNotEligible => codes::SIGNER_NOT_ELIGIBLE,
            Error::StaleRoot { .. } => codes::STALE_ROOT,
            Error::KeyMismatch { .. } => codes::KEY_MISMATCH,
            Error::MalformedWitness(_) => codes::MALFORMED_WITNESS,
            Error::ProposalMismatch(_) => codes::PROPOSAL_MISMATCH,
            Error::ChainMismatch(_) => codes::CHAIN_MISMATCH,
            Error::InvariantViolation(_) => codes::INVARIANT_VIOLATION,
            Error::AlreadyInitialized | Error::NotInitialized | Error::InvalidRequest(_) => {
                codes::INVALID_ARGUMENT
            }
            Error::Overflow => codes::OVERFLOW,
            Error::InsufficientFunds { .. } => codes::INSUFFICIENT_FUNDS,
        }
    }

    /// Whether resubmitting with fresh roots and witnesses can succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Consistency
    }
}

/// Result type alias for tallyroot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes
pub mod codes {
    /// Success
    pub const OK: u32 = 0;
    /// Invalid argument
    pub const INVALID_ARGUMENT: u32 = 3;
    /// Unauthorized: bad signature
    pub const INVALID_SIGNATURE: u32 = 7;
    /// Unauthorized: bad proof
    pub const INVALID_PROOF: u32 = 8;
    /// Unauthorized: not eligible or already voted
    pub const SIGNER_NOT_ELIGIBLE: u32 = 9;
    /// Insufficient funds
    pub const INSUFFICIENT_FUNDS: u32 = 10;
    /// Stale root
    pub const STALE_ROOT: u32 = 20;
    /// Witness key mismatch
    pub const KEY_MISMATCH: u32 = 21;
    /// Malformed witness
    pub const MALFORMED_WITNESS: u32 = 22;
    /// Proposal mismatch
    pub const PROPOSAL_MISMATCH: u32 = 23;
    /// Non-adjacent proofs
    pub const CHAIN_MISMATCH: u32 = 24;
    /// Invariant violation
    pub const INVARIANT_VIOLATION: u32 = 30;
    /// Arithmetic overflow
    pub const OVERFLOW: u32 = 31;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidRequest("threshold is zero".to_string());
        assert_eq!(err.to_string(), "invalid request:: threshold is zero");

        assert_eq!(
            Error::SignerNotEligible.to_string(),
            "unauthorized:: already voted or not an eligible signer"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::InvalidSignature.kind(), ErrorKind::Authorization);
        assert_eq!(
            Error::InvariantViolation("roster".into()).kind(),
            ErrorKind::Invariant
        );
        assert_eq!(
            Error::ChainMismatch("merge".into()).kind(),
            ErrorKind::Consistency
        );
        assert_eq!(
            Error::InsufficientFunds {
                needed: 2,
                available: 1
            }
            .kind(),
            ErrorKind::Funds
        );
    }

    #[test]
    fn test_only_consistency_errors_are_retryable() {
        let stale = Error::StaleRoot {
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(stale.is_retryable());
        assert!(!Error::SignerNotEligible.is_retryable());
        assert!(!Error::AlreadyInitialized.is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidSignature.code(), codes::INVALID_SIGNATURE);
        assert_eq!(Error::NotInitialized.code(), codes::INVALID_ARGUMENT);
        assert_ne!(Error::Overflow.code(), codes::OK);
    }
}
