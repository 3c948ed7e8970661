//! Proof-of-work for Merit blocks.
//!
//! A block header is valid when its hash, read as a big-endian integer, is at
//! least the chain's current difficulty. Producing one means searching the
//! header's proof field; this crate owns that search, the predicate, and the
//! rule that moves the difficulty at retarget boundaries.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod validator;

pub use difficulty::{retarget, MAX_ADJUSTMENT};
pub use error::WorkError;
pub use generator::{CancelToken, Candidate, WorkGenerator};
pub use validator::meets_difficulty;
