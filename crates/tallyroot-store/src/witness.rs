//! Witness verification and rerooting

use crate::{AuthenticatedMap, MapKey, Result, StoreError, TREE_DEPTH};
use serde::{Deserialize, Serialize};
use tallyroot_crypto::{FieldHasher, Hash};

/// Hash of an internal node
pub(crate) fn hash_node(left: &Hash, right: &Hash) -> Hash {
    FieldHasher::new("tallyroot/smt-node")
        .hash(left)
        .hash(right)
        .finish()
}

/// Authentication path for one map slot, ordered from the leaf to the root.
///
/// `is_left[level]` tells whether the path node at `level` is a left child;
/// the key is recovered from these flags, so a witness authenticates exactly
/// one key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapWitness {
    pub is_left: Vec<bool>,
    pub siblings: Vec<Hash>,
}

impl MapWitness {
    /// Recompute the root for `value` at the authenticated slot, and the key
    /// of that slot
    pub fn compute_root_and_key(&self, value: &Hash) -> Result<(Hash, MapKey)> {
        if self.is_left.len() != TREE_DEPTH || self.siblings.len() != TREE_DEPTH {
            return Err(StoreError::MalformedWitness(format!(
                "expected {TREE_DEPTH} levels, got {} flags and {} siblings",
                self.is_left.len(),
                self.siblings.len()
            )));
        }

        let mut current = *value;
        let mut key = MapKey::default();
        for (level, (is_left, sibling)) in self.is_left.iter().zip(&self.siblings).enumerate() {
            if *is_left {
                current = hash_node(&current, sibling);
            } else {
                current = hash_node(sibling, &current);
                key = key.with_bit(level);
            }
        }

        Ok((current, key))
    }

    /// Key this witness authenticates
    pub fn key(&self) -> Result<MapKey> {
        Ok(self.compute_root_and_key(&crate::EMPTY_VALUE)?.1)
    }
}

/// Check that `witness` proves `key -> value` under `root`.
///
/// Both the recomputed root and the recovered key must match; a witness for
/// some other key fails closed even if its root happens to match.
pub fn check_membership(
    witness: &MapWitness,
    root: &Hash,
    key: &MapKey,
    value: &Hash,
) -> Result<()> {
    let (computed_root, computed_key) = witness.compute_root_and_key(value)?;
    if computed_key != *key {
        return Err(StoreError::KeyMismatch {
            expected: *key,
            actual: computed_key,
        });
    }
    if computed_root != *root {
        return Err(StoreError::RootMismatch {
            expected: *root,
            actual: computed_root,
        });
    }
    Ok(())
}

/// Root that results from writing `new_value` at `key`, using the witness of
/// that key under the old root
pub fn put_and_reroot(witness: &MapWitness, key: &MapKey, new_value: &Hash) -> Result<Hash> {
    let (new_root, computed_key) = witness.compute_root_and_key(new_value)?;
    if computed_key != *key {
        return Err(StoreError::KeyMismatch {
            expected: *key,
            actual: computed_key,
        });
    }
    Ok(new_root)
}

/// Stateless [`AuthenticatedMap`] used by the root-holding authority
#[derive(Debug, Default, Clone, Copy)]
pub struct WitnessVerifier;

impl AuthenticatedMap for WitnessVerifier {
    fn verify(&self, root: &Hash, key: &MapKey, witness: &MapWitness, value: &Hash) -> Result<()> {
        check_membership(witness, root, key, value)
    }

    fn reroot(&self, witness: &MapWitness, key: &MapKey, new_value: &Hash) -> Result<Hash> {
        put_and_reroot(witness, key, new_value)
    }
}
