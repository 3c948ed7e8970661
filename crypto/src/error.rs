use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("cannot aggregate an empty set of signatures")]
    EmptyAggregate,

    #[error("entropy source failed: {0}")]
    Entropy(String),
}
