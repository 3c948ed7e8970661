//! Cryptographic primitives for the Merit chain.
//!
//! - **Blake2b** for hashing (headers, element identities, Merkle nodes)
//! - **BLS12-381** for element signatures and their per-block aggregate
//! - Binary Merkle trees with inclusion proofs
//!
//! Consensus and the chain only see the [`SignatureScheme`] trait; [`BlsScheme`]
//! is the implementation the node runs with.

pub mod bls;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod scheme;

pub use bls::{generate_keypair, keypair_from_seed, BlsScheme};
pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi, hash_parts};
pub use merkle::{merkle_root, prove, MerkleProof};
pub use scheme::SignatureScheme;
