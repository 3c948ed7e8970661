//! Binary Merkle trees over 32-byte leaves.
//!
//! A level with an odd number of nodes pairs its last node with itself.
//! Leaves and internal nodes are hashed under different prefixes so a leaf can
//! never be passed off as an internal node.

use merit_types::Hash;
use serde::{Deserialize, Serialize};

use crate::hash::hash_parts;

const LEAF_PREFIX: &[u8] = &[0x00];
const NODE_PREFIX: &[u8] = &[0x01];

fn hash_leaf(leaf: &Hash) -> Hash {
    hash_parts(&[LEAF_PREFIX, leaf.as_bytes()])
}

fn hash_node(left: &Hash, right: &Hash) -> Hash {
    hash_parts(&[NODE_PREFIX, left.as_bytes(), right.as_bytes()])
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_node(left, right),
            [single] => hash_node(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// Root of the tree over `leaves`, in the given order.
///
/// The empty tree has root [`Hash::ZERO`].
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return Hash::ZERO;
    }
    let mut level: Vec<Hash> = leaves.iter().map(hash_leaf).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Proof that `leaf` sits at `index` under some root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Hash,
    pub index: usize,
    /// Sibling hashes from the leaf level upwards.
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Whether this proof leads from its leaf to `root`.
    pub fn verify(&self, root: &Hash) -> bool {
        let mut current = hash_leaf(&self.leaf);
        let mut index = self.index;
        for sibling in &self.siblings {
            current = if index % 2 == 0 {
                hash_node(&current, sibling)
            } else {
                hash_node(sibling, &current)
            };
            index /= 2;
        }
        index == 0 && current == *root
    }
}

/// Build an inclusion proof for `leaves[index]`, or `None` if out of range.
pub fn prove(leaves: &[Hash], index: usize) -> Option<MerkleProof> {
    let leaf = *leaves.get(index)?;
    let mut level: Vec<Hash> = leaves.iter().map(hash_leaf).collect();
    let mut position = index;
    let mut siblings = Vec::new();
    while level.len() > 1 {
        let sibling_pos = position ^ 1;
        // The last node of an odd level is its own sibling.
        let sibling = level.get(sibling_pos).unwrap_or(&level[position]);
        siblings.push(*sibling);
        level = next_level(&level);
        position /= 2;
    }
    Some(MerkleProof {
        leaf,
        index,
        siblings,
    })
}
