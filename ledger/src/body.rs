//! Block bodies: which validator slots a block finalizes.

use merit_types::{Hash, PublicKey};
use serde::{Deserialize, Serialize};

/// One finalized `(holder, nonce)` slot and the Merkle root of its elements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub holder: PublicKey,
    pub nonce: u64,
    pub merkle: Hash,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockBody {
    records: Vec<Record>,
}

impl BlockBody {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The committed slots, in body order.
    pub fn entries(&self) -> Vec<(PublicKey, u64)> {
        self.records
            .iter()
            .map(|r| (r.holder.clone(), r.nonce))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
