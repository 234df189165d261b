//! Key representations using static enum dispatch

use crate::address::Address;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{SigningKey as Ed25519PrivKey, VerifyingKey as Ed25519PubKey};
use k256::ecdsa::{SigningKey as Secp256k1PrivKey, VerifyingKey as Secp256k1PubKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SECP256K1_TYPE_URL: &str = "/tallyroot.crypto.secp256k1.PubKey";
const ED25519_TYPE_URL: &str = "/tallyroot.crypto.ed25519.PubKey";

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("unknown public key type: {0}")]
    UnknownType(String),
}

/// Supported signature schemes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    Secp256k1,
    Ed25519,
}

/// All supported public key types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Secp256k1(Secp256k1PubKey),
    Ed25519(Ed25519PubKey),
}

/// All supported private key types
#[derive(Clone, Debug)]
pub enum PrivateKey {
    Secp256k1(Secp256k1PrivKey),
    Ed25519(Ed25519PrivKey),
}

impl PublicKey {
    /// Derive the account address of this key
    pub fn to_address(&self) -> Address {
        Address::from_pubkey(&self.to_bytes())
    }

    /// Canonical 32-byte field representation, used as the key in signer maps.
    ///
    /// For secp256k1 this is the x coordinate; for ed25519 the encoded point.
    pub fn field_repr(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            PublicKey::Secp256k1(key) => {
                let point = key.to_encoded_point(true);
                out.copy_from_slice(&point.as_bytes()[1..33]);
            }
            PublicKey::Ed25519(key) => out.copy_from_slice(key.as_bytes()),
        }
        out
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            PublicKey::Secp256k1(_) => KeyKind::Secp256k1,
            PublicKey::Ed25519(_) => KeyKind::Ed25519,
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            PublicKey::Secp256k1(_) => SECP256K1_TYPE_URL,
            PublicKey::Ed25519(_) => ED25519_TYPE_URL,
        }
    }

    /// Convert to raw bytes (compressed SEC1 for secp256k1)
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Secp256k1(key) => key.to_encoded_point(true).as_bytes().to_vec(),
            PublicKey::Ed25519(key) => key.as_bytes().to_vec(),
        }
    }

    /// Parse from a type URL and raw key bytes
    pub fn from_type_and_bytes(type_url: &str, value: &[u8]) -> Result<Self, KeyError> {
        match type_url {
            SECP256K1_TYPE_URL => {
                let key = Secp256k1PubKey::from_sec1_bytes(value)
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
                Ok(PublicKey::Secp256k1(key))
            }
            ED25519_TYPE_URL => {
                let bytes: &[u8; 32] = value
                    .try_into()
                    .map_err(|_| KeyError::InvalidKey("invalid ed25519 key length".to_string()))?;
                let key = Ed25519PubKey::from_bytes(bytes)
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
                Ok(PublicKey::Ed25519(key))
            }
            _ => Err(KeyError::UnknownType(type_url.to_string())),
        }
    }
}

impl PrivateKey {
    /// Generate a fresh key from the OS entropy source
    pub fn generate(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Secp256k1 => PrivateKey::Secp256k1(Secp256k1PrivKey::random(&mut OsRng)),
            KeyKind::Ed25519 => {
                PrivateKey::Ed25519(Ed25519PrivKey::from_bytes(&rand::random::<[u8; 32]>()))
            }
        }
    }

    /// Build a key from a 32-byte secret
    pub fn from_secret(kind: KeyKind, secret: &[u8; 32]) -> Result<Self, KeyError> {
        match kind {
            KeyKind::Secp256k1 => Secp256k1PrivKey::from_slice(secret)
                .map(PrivateKey::Secp256k1)
                .map_err(|e| KeyError::InvalidKey(e.to_string())),
            KeyKind::Ed25519 => Ok(PrivateKey::Ed25519(Ed25519PrivKey::from_bytes(secret))),
        }
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Secp256k1(key) => PublicKey::Secp256k1(*key.verifying_key()),
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PublicKeyData {
    #[serde(rename = "type")]
    key_type: String,
    value: String,
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let data = PublicKeyData {
            key_type: self.type_url().to_string(),
            value: general_purpose::STANDARD.encode(self.to_bytes()),
        };

        data.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = PublicKeyData::deserialize(deserializer)?;
        let bytes = general_purpose::STANDARD
            .decode(&data.value)
            .map_err(serde::de::Error::custom)?;

        PublicKey::from_type_and_bytes(&data.key_type, &bytes).map_err(serde::de::Error::custom)
    }
}
