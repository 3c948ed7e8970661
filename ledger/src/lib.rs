//! The Merit chain.
//!
//! Blocks are mined with proof of work and each one finalizes a set of
//! validator slots from the consensus registry. The header commits to those
//! slots through an aggregate signature; the body lists each slot with the
//! Merkle root of its elements.
//!
//! - [`header`], [`body`], [`block`]: block structure and hashing.
//! - [`genesis`]: per-network genesis block.
//! - [`mining`]: proof search over headers.
//! - [`merit`]: the chain itself and block admission.
//! - [`snapshot`]: persisted state and replay.

pub mod block;
pub mod body;
pub mod error;
pub mod genesis;
pub mod header;
pub mod merit;
pub mod mining;
pub mod snapshot;

pub use block::Block;
pub use body::{BlockBody, Record};
pub use error::LedgerError;
pub use genesis::{genesis_block, genesis_seed};
pub use header::BlockHeader;
pub use merit::{BlockOutcome, Blockchain, Merit, NoTransactions, TransactionsContext};
pub use mining::mine;
pub use snapshot::StateSnapshot;
