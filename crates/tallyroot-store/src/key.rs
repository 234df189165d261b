//! Map keys
//!
//! A key is a 256-bit big-endian integer. Bit `0` is the least significant
//! bit and selects the branch closest to the leaves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of an authenticated map slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapKey([u8; 32]);

impl MapKey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Value of bit `index`
    pub fn bit(&self, index: usize) -> bool {
        (self.0[31 - index / 8] >> (index % 8)) & 1 == 1
    }

    /// Copy of this key with bit `index` set
    pub fn with_bit(mut self, index: usize) -> Self {
        self.0[31 - index / 8] |= 1 << (index % 8);
        self
    }

    /// Copy of this key with bit `index` flipped
    pub fn with_bit_flipped(mut self, index: usize) -> Self {
        self.0[31 - index / 8] ^= 1 << (index % 8);
        self
    }

    /// Copy of this key with its `len` lowest bits cleared; identifies the
    /// subtree `len` levels above the leaf
    pub fn prefix(mut self, len: usize) -> Self {
        for index in 0..len.min(256) {
            self.0[31 - index / 8] &= !(1 << (index % 8));
        }
        self
    }
}

impl From<[u8; 32]> for MapKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<u64> for MapKey {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
