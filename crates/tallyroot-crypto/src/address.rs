//! Account addresses

use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Human-readable prefix used by `Display`
pub const DEFAULT_PREFIX: &str = "tally";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("bech32 error: {0}")]
    Bech32(String),

    #[error("invalid address length: {0}")]
    InvalidLength(usize),
}

/// Account address - 20 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address([u8; 20]);

impl Address {
    /// Derive an address from public key bytes: ripemd160(sha256(pubkey_bytes))
    pub fn from_pubkey(pubkey_bytes: &[u8]) -> Self {
        let sha256_hash = Sha256::digest(pubkey_bytes);
        let ripemd160_hash = Ripemd160::digest(sha256_hash);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&ripemd160_hash);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Convert to Bech32 string with the given prefix
    pub fn to_bech32(&self, prefix: &str) -> Result<String, AddressError> {
        let hrp = Hrp::parse(prefix).map_err(|e| AddressError::InvalidPrefix(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.0).map_err(|e| AddressError::Bech32(e.to_string()))
    }

    /// Parse from Bech32 string, returning the prefix alongside the address
    pub fn from_bech32(s: &str) -> Result<(String, Self), AddressError> {
        let (hrp, data) = bech32::decode(s).map_err(|e| AddressError::Bech32(e.to_string()))?;
        if data.len() != 20 {
            return Err(AddressError::InvalidLength(data.len()));
        }
        let mut addr_bytes = [0u8; 20];
        addr_bytes.copy_from_slice(&data);
        Ok((hrp.to_string(), Self(addr_bytes)))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_bech32(DEFAULT_PREFIX).map_err(|_| fmt::Error)?;
        write!(f, "{encoded}")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, addr) = Self::from_bech32(s)?;
        Ok(addr)
    }
}
