//! PoW validation.

use merit_types::{Difficulty, Hash};

/// Whether `hash` meets `difficulty`: read big-endian, it must be at least
/// the threshold.
pub fn meets_difficulty(hash: &Hash, difficulty: Difficulty) -> bool {
    difficulty.is_met_by(hash)
}
