//! Signature operations

use crate::digest::{FieldHasher, Hash};
use crate::keys::{PrivateKey, PublicKey};
use signature::{Signer, Verifier};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("verification failed")]
    VerificationFailed,
}

/// Sign a message with a private key
pub fn sign_message(key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, SignatureError> {
    match key {
        PrivateKey::Secp256k1(k) => {
            use k256::ecdsa::Signature;
            let sig: Signature = k
                .try_sign(message)
                .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;
            Ok(sig.to_der().as_bytes().to_vec())
        }
        PrivateKey::Ed25519(k) => {
            use ed25519_dalek::Signature;
            let sig: Signature = k.sign(message);
            Ok(sig.to_bytes().to_vec())
        }
    }
}

/// Verify a signature with a public key
pub fn verify_signature(
    key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    match key {
        PublicKey::Secp256k1(k) => {
            use k256::ecdsa::Signature;
            let sig =
                Signature::from_der(signature).map_err(|_| SignatureError::VerificationFailed)?;
            k.verify(message, &sig)
                .map_err(|_| SignatureError::VerificationFailed)?;
            Ok(())
        }
        PublicKey::Ed25519(k) => {
            use ed25519_dalek::Signature;
            let sig = Signature::from_bytes(
                signature
                    .try_into()
                    .map_err(|_| SignatureError::VerificationFailed)?,
            );
            k.verify(message, &sig)
                .map_err(|_| SignatureError::VerificationFailed)?;
            Ok(())
        }
    }
}

/// Message a signer authorizes when voting directly: `(proposal_hash, vote)`
pub fn vote_message(proposal_hash: &Hash, vote: bool) -> Hash {
    FieldHasher::new("tallyroot/vote")
        .hash(proposal_hash)
        .bool(vote)
        .finish()
}

/// Sign a vote on the proposal state with the given digest
pub fn sign_vote(
    key: &PrivateKey,
    proposal_hash: &Hash,
    vote: bool,
) -> Result<Vec<u8>, SignatureError> {
    sign_message(key, &vote_message(proposal_hash, vote))
}

/// Verify a vote signature
pub fn verify_vote(
    key: &PublicKey,
    proposal_hash: &Hash,
    vote: bool,
    signature: &[u8],
) -> Result<(), SignatureError> {
    verify_signature(key, &vote_message(proposal_hash, vote), signature)
}
