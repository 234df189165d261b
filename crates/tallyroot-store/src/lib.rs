//! Authenticated sparse maps for the tallyroot protocol.
//!
//! The authority side only ever holds a root and checks witnesses against it
//! ([`WitnessVerifier`]); the full contents live with whoever maintains a
//! [`SparseMerkleMap`] and hands out witnesses.

pub mod key;
pub mod smt;
pub mod witness;

use tallyroot_crypto::{digest::to_hex, Hash, ZERO_HASH};
use thiserror::Error;

pub use key::MapKey;
pub use smt::{empty_root, SparseMerkleMap};
pub use witness::{check_membership, put_and_reroot, MapWitness, WitnessVerifier};

/// Number of levels between a leaf and the root
pub const TREE_DEPTH: usize = 256;

/// Value held by every absent key; non-membership is membership of this value
pub const EMPTY_VALUE: Hash = ZERO_HASH;

/// Store error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("root mismatch: expected {}, got {}", to_hex(.expected), to_hex(.actual))]
    RootMismatch { expected: Hash, actual: Hash },

    #[error("key mismatch: expected {expected}, witness authenticates {actual}")]
    KeyMismatch { expected: MapKey, actual: MapKey },

    #[error("malformed witness: {0}")]
    MalformedWitness(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for tallyroot_errors::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RootMismatch { expected, actual } => tallyroot_errors::Error::StaleRoot {
                expected: to_hex(&expected),
                actual: to_hex(&actual),
            },
            StoreError::KeyMismatch { expected, actual } => tallyroot_errors::Error::KeyMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
            StoreError::MalformedWitness(msg) => tallyroot_errors::Error::MalformedWitness(msg),
        }
    }
}

/// Witness-driven view of a keyed digest store.
///
/// Implementations never need the map contents: a root plus a per-key
/// witness is enough to check a stored value and to derive the root that a
/// single-key update produces.
pub trait AuthenticatedMap {
    /// Check that `witness` proves `key -> value` under `root`
    fn verify(&self, root: &Hash, key: &MapKey, witness: &MapWitness, value: &Hash) -> Result<()>;

    /// Root after replacing the value at `key` with `new_value`
    fn reroot(&self, witness: &MapWitness, key: &MapKey, new_value: &Hash) -> Result<Hash>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_to_consistency_error() {
        let err: tallyroot_errors::Error = StoreError::RootMismatch {
            expected: [1u8; 32],
            actual: [2u8; 32],
        }
        .into();
        assert_eq!(err.kind(), tallyroot_errors::ErrorKind::Consistency);

        let err: tallyroot_errors::Error = StoreError::KeyMismatch {
            expected: MapKey::from(1u64),
            actual: MapKey::from(2u64),
        }
        .into();
        assert!(matches!(err, tallyroot_errors::Error::KeyMismatch { .. }));
    }
}
