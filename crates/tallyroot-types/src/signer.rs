//! Signer records

use serde::{Deserialize, Serialize};
use tallyroot_crypto::{FieldHasher, Hash, PublicKey};
use tallyroot_store::MapKey;

/// Entry of a signer map: who the signer is and whether they already voted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerRecord {
    pub pubkey: PublicKey,
    pub voted: bool,
}

impl SignerRecord {
    /// Record of an eligible signer that has not voted
    pub fn eligible(pubkey: PublicKey) -> Self {
        Self {
            pubkey,
            voted: false,
        }
    }

    /// Same signer after voting
    pub fn voted(pubkey: PublicKey) -> Self {
        Self {
            pubkey,
            voted: true,
        }
    }

    pub fn hash(&self) -> Hash {
        FieldHasher::new("tallyroot/signer")
            .bytes(&self.pubkey.to_bytes())
            .bool(self.voted)
            .finish()
    }

    /// Slot of this signer in a signer map
    pub fn map_key(&self) -> MapKey {
        signer_key(&self.pubkey)
    }
}

/// Slot of `pubkey` in a signer map
pub fn signer_key(pubkey: &PublicKey) -> MapKey {
    MapKey::from(pubkey.field_repr())
}
