//! Sparse Merkle map held by the party that maintains full map contents.
//!
//! Only nodes that differ from the default (all-empty) subtree of their level
//! are stored, so memory is proportional to the number of occupied slots.

use crate::witness::hash_node;
use crate::{MapKey, MapWitness, EMPTY_VALUE, TREE_DEPTH};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tallyroot_crypto::Hash;
use tracing::trace;

/// Root of an all-empty subtree at each level, leaf level first
fn default_hashes() -> &'static [Hash] {
    static DEFAULTS: OnceLock<Vec<Hash>> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        let mut hashes = Vec::with_capacity(TREE_DEPTH + 1);
        hashes.push(EMPTY_VALUE);
        for level in 0..TREE_DEPTH {
            let below = hashes[level];
            hashes.push(hash_node(&below, &below));
        }
        hashes
    })
}

/// Root of the map with no occupied slots
pub fn empty_root() -> Hash {
    default_hashes()[TREE_DEPTH]
}

/// An in-memory sparse Merkle map producing witnesses for any key
#[derive(Clone, Debug, Default)]
pub struct SparseMerkleMap {
    /// Occupied slots
    values: BTreeMap<MapKey, Hash>,
    /// Non-default nodes keyed by (level, subtree prefix)
    nodes: HashMap<(usize, MapKey), Hash>,
}

impl SparseMerkleMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from key/value pairs
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (MapKey, Hash)>,
    {
        let mut map = Self::new();
        for (key, value) in entries {
            map.set(key, value);
        }
        map
    }

    /// Current root
    pub fn root(&self) -> Hash {
        self.node(TREE_DEPTH, &MapKey::default())
    }

    /// Value stored at `key`, `EMPTY_VALUE` if absent
    pub fn get(&self, key: &MapKey) -> Hash {
        self.values.get(key).copied().unwrap_or(EMPTY_VALUE)
    }

    /// Whether `key` holds a non-empty value
    pub fn contains(&self, key: &MapKey) -> bool {
        self.values.contains_key(key)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write `value` at `key` and return the new root. Writing `EMPTY_VALUE`
    /// removes the slot.
    pub fn set(&mut self, key: MapKey, value: Hash) -> Hash {
        if value == EMPTY_VALUE {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }

        let mut current = value;
        self.write_node(0, key, current);
        for level in 0..TREE_DEPTH {
            let sibling = self.node(level, &key.prefix(level).with_bit_flipped(level));
            current = if key.bit(level) {
                hash_node(&sibling, &current)
            } else {
                hash_node(&current, &sibling)
            };
            self.write_node(level + 1, key.prefix(level + 1), current);
        }

        trace!(key = %key, slots = self.values.len(), "sparse map updated");
        current
    }

    /// Reset `key` to `EMPTY_VALUE`
    pub fn remove(&mut self, key: &MapKey) -> Hash {
        self.set(*key, EMPTY_VALUE)
    }

    /// Witness for `key` under the current root
    pub fn witness(&self, key: &MapKey) -> MapWitness {
        let mut is_left = Vec::with_capacity(TREE_DEPTH);
        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        for level in 0..TREE_DEPTH {
            is_left.push(!key.bit(level));
            siblings.push(self.node(level, &key.prefix(level).with_bit_flipped(level)));
        }
        MapWitness { is_left, siblings }
    }

    fn node(&self, level: usize, prefix: &MapKey) -> Hash {
        self.nodes
            .get(&(level, *prefix))
            .copied()
            .unwrap_or(default_hashes()[level])
    }

    fn write_node(&mut self, level: usize, prefix: MapKey, hash: Hash) {
        if hash == default_hashes()[level] {
            self.nodes.remove(&(level, prefix));
        } else {
            self.nodes.insert((level, prefix), hash);
        }
    }
}
