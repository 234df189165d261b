//! Cryptographic primitives for tallyroot
//!
//! Keys and signatures come from the RustCrypto project; committed values are
//! digested with domain-separated SHA-256 (see [`digest::FieldHasher`]).

pub mod address;
pub mod digest;
pub mod keys;
pub mod signature;

pub use address::{Address, AddressError};
pub use digest::{short_hex, to_hex, FieldHasher, Hash, ZERO_HASH};
pub use keys::{KeyError, KeyKind, PrivateKey, PublicKey};
pub use signature::{
    sign_message, sign_vote, verify_signature, verify_vote, vote_message, SignatureError,
};
