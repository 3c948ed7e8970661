use merit_consensus::ConsensusError;
use merit_types::{Hash, PublicKey};
use merit_work::WorkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("block {height} does not extend the tip: {reason}")]
    InvalidLinkage { height: u64, reason: String },

    #[error("block {height} hash {hash} does not meet the difficulty")]
    InsufficientWork { height: u64, hash: Hash },

    #[error("invalid elements commitment: {0}")]
    InvalidCommitment(String),

    #[error("unverified element at {holder}/{nonce}")]
    UnverifiedElement { holder: PublicKey, nonce: u64 },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("transactions rejected block: {0}")]
    Transactions(String),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Work(#[from] WorkError),
}
