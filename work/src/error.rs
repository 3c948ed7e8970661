use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("proof search cancelled")]
    Cancelled,

    #[error("proof space exhausted searching from {start}")]
    Exhausted { start: u64 },
}
