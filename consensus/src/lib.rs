//! Consensus elements and the registry that tracks them.
//!
//! Validators (holders) sign [`Element`]s at increasing nonces. Two different
//! elements at the same `(holder, nonce)` are a conflict; anyone who
//! observes one can wrap the pair in a [`MeritRemoval`] to have the holder
//! removed.
//!
//! - [`element`]: element kinds, hashing, signing and verification.
//! - [`conflict`]: the conflict predicate.
//! - [`registry`]: the [`Consensus`] registry: admission, aggregates,
//!   Merkle commitments, archive tracking and persistence.
//! - [`error`]: consensus error types.

pub mod conflict;
pub mod element;
pub mod error;
pub mod registry;

pub use conflict::conflicts;
pub use element::{
    Element, ElementKind, ElementRef, Evidence, MeritRemoval, SignedElement, Verification,
};
pub use error::ConsensusError;
pub use registry::{AddOutcome, Consensus};
