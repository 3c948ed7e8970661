use merit_crypto::CryptoError;
use merit_types::{Hash, PublicKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("invalid signature on element {holder}/{nonce}")]
    InvalidSignature { holder: PublicKey, nonce: u64 },

    #[error("merit removal references unknown element {hash} at {holder}/{nonce}")]
    UnknownReferencedElement {
        holder: PublicKey,
        nonce: u64,
        hash: Hash,
    },

    #[error("merit removal evidence at {holder}/{nonce} is not a conflict")]
    NotAConflict { holder: PublicKey, nonce: u64 },

    #[error("no element at {holder}/{nonce}")]
    MissingElement { holder: PublicKey, nonce: u64 },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
