//! Fundamental types for the Merit chain.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! hashes, keys and signatures, timestamps, difficulty thresholds and chain parameters.

pub mod difficulty;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod time;

pub use difficulty::Difficulty;
pub use error::DecodeError;
pub use hash::Hash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use params::ChainParams;
pub use time::Timestamp;
