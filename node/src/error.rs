use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] merit_ledger::LedgerError),

    #[error("consensus error: {0}")]
    Consensus(#[from] merit_consensus::ConsensusError),

    #[error("crypto error: {0}")]
    Crypto(#[from] merit_crypto::CryptoError),

    #[error("config error: {0}")]
    Config(String),

    #[error("state record error: {0}")]
    Snapshot(String),

    #[error("tip moved past height {height} while mining")]
    Stale { height: u64 },

    #[error("chain state lock poisoned")]
    Poisoned,

    #[error("mining task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
