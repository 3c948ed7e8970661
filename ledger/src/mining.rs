//! Proof search over block headers.

use merit_types::{Difficulty, Hash};
use merit_work::{CancelToken, Candidate, WorkGenerator};

use crate::{BlockHeader, LedgerError};

impl Candidate for BlockHeader {
    fn hash_with_proof(&self, proof: u64) -> Hash {
        self.hash_with(proof)
    }
}

/// Find a proof for `header` and return the resulting header.
///
/// The search starts at the header's current proof. `header` itself is never
/// modified; a cancelled search returns `LedgerError::Work(Cancelled)`.
pub fn mine(
    header: &BlockHeader,
    difficulty: Difficulty,
    generator: &WorkGenerator,
    cancel: &CancelToken,
) -> Result<BlockHeader, LedgerError> {
    let proof = generator.search(header, difficulty, header.proof(), cancel)?;
    tracing::debug!(height = header.height(), proof, "proof found");
    Ok(header.with_proof(proof))
}
