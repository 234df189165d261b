//! Structured digests
//!
//! Every committed value is hashed through [`FieldHasher`]: a SHA-256 stream
//! opened with a domain tag, with each field length-framed so that distinct
//! field sequences never share an encoding.

use sha2::{Digest, Sha256};

/// A 32-byte digest
pub type Hash = [u8; 32];

/// The all-zero digest
pub const ZERO_HASH: Hash = [0u8; 32];

/// Incremental hasher over typed fields
#[derive(Clone)]
pub struct FieldHasher {
    inner: Sha256,
}

impl FieldHasher {
    /// Start a digest in the given domain
    pub fn new(domain: &str) -> Self {
        let mut inner = Sha256::new();
        inner.update((domain.len() as u32).to_be_bytes());
        inner.update(domain.as_bytes());
        Self { inner }
    }

    /// Append a variable-length byte field
    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.inner.update((value.len() as u32).to_be_bytes());
        self.inner.update(value);
        self
    }

    /// Append a digest field
    pub fn hash(mut self, value: &Hash) -> Self {
        self.inner.update(value);
        self
    }

    /// Append an integer field
    pub fn u64(mut self, value: u64) -> Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    /// Append a boolean field
    pub fn bool(mut self, value: bool) -> Self {
        self.inner.update([value as u8]);
        self
    }

    /// Finish the digest
    pub fn finish(self) -> Hash {
        self.inner.finalize().into()
    }
}

/// Hex-encode a digest
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// First four bytes of a digest in hex, for log fields
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}
