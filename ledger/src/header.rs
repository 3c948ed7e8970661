//! Block headers.
//!
//! A header's hash is a pure function of its other fields. The fields are
//! private so the stored hash cannot drift from them: every setter rehashes,
//! and a deserialized header whose stored hash disagrees is rejected.

use merit_crypto::hash_parts;
use merit_types::{Hash, Signature, Timestamp};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "HeaderRecord")]
pub struct BlockHeader {
    height: u64,
    previous_hash: Hash,
    time: Timestamp,
    proof: u64,
    /// Aggregate signature over every element the block commits to.
    aggregate: Signature,
    hash: Hash,
}

impl BlockHeader {
    /// A header with proof 0, already hashed.
    pub fn new(height: u64, previous_hash: Hash, time: Timestamp, aggregate: Signature) -> Self {
        let mut header = Self {
            height,
            previous_hash,
            time,
            proof: 0,
            aggregate,
            hash: Hash::ZERO,
        };
        header.rehash();
        header
    }

    /// Hash the fields as they would be with `proof` substituted.
    pub(crate) fn hash_with(&self, proof: u64) -> Hash {
        hash_parts(&[
            &self.height.to_be_bytes(),
            self.previous_hash.as_bytes(),
            &self.time.to_be_bytes(),
            &proof.to_be_bytes(),
            self.aggregate.as_bytes(),
        ])
    }

    pub fn compute_hash(&self) -> Hash {
        self.hash_with(self.proof)
    }

    pub fn rehash(&mut self) {
        self.hash = self.compute_hash();
    }

    /// A copy of this header carrying `proof`.
    pub fn with_proof(&self, proof: u64) -> Self {
        let mut header = self.clone();
        header.set_proof(proof);
        header
    }

    pub fn set_proof(&mut self, proof: u64) {
        self.proof = proof;
        self.rehash();
    }

    pub fn set_time(&mut self, time: Timestamp) {
        self.time = time;
        self.rehash();
    }

    pub fn set_aggregate(&mut self, aggregate: Signature) {
        self.aggregate = aggregate;
        self.rehash();
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn previous_hash(&self) -> Hash {
        self.previous_hash
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn proof(&self) -> u64 {
        self.proof
    }

    pub fn aggregate(&self) -> &Signature {
        &self.aggregate
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HeaderRecord {
    height: u64,
    previous_hash: Hash,
    time: Timestamp,
    proof: u64,
    aggregate: Signature,
    hash: Hash,
}

impl TryFrom<HeaderRecord> for BlockHeader {
    type Error = LedgerError;

    fn try_from(record: HeaderRecord) -> Result<Self, Self::Error> {
        let header = Self {
            height: record.height,
            previous_hash: record.previous_hash,
            time: record.time,
            proof: record.proof,
            aggregate: record.aggregate,
            hash: record.hash,
        };
        let computed = header.compute_hash();
        if computed != header.hash {
            return Err(LedgerError::MalformedRecord(format!(
                "header {} stores hash {} but hashes to {computed}",
                header.height, header.hash
            )));
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> BlockHeader {
        BlockHeader::new(3, Hash::new([7; 32]), Timestamp::new(1_000), Signature::default())
    }

    #[test]
    fn new_header_is_hashed() {
        let h = header();
        assert_eq!(h.hash(), h.compute_hash());
        assert_eq!(h.proof(), 0);
    }

    #[test]
    fn setters_rehash() {
        let mut h = header();
        let before = h.hash();
        h.set_time(Timestamp::new(2_000));
        assert_ne!(h.hash(), before);
        assert_eq!(h.hash(), h.compute_hash());

        let before = h.hash();
        h.set_aggregate(Signature(vec![1, 2, 3]));
        assert_ne!(h.hash(), before);
        assert_eq!(h.hash(), h.compute_hash());
    }

    #[test]
    fn with_proof_leaves_original_untouched() {
        let h = header();
        let mined = h.with_proof(42);
        assert_eq!(h.proof(), 0);
        assert_eq!(mined.proof(), 42);
        assert_ne!(mined.hash(), h.hash());
        assert_eq!(mined.hash(), h.hash_with(42));
    }

    #[test]
    fn json_roundtrip() {
        let h = header().with_proof(9);
        let json = serde_json::to_string(&h).unwrap();
        let back: BlockHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn tampered_json_rejected() {
        let h = header();
        let mut json = serde_json::to_value(&h).unwrap();
        json["proof"] = serde_json::json!(77);
        assert!(serde_json::from_value::<BlockHeader>(json).is_err());
    }

    #[test]
    fn bincode_roundtrip() {
        let h = header().with_proof(5);
        let bytes = bincode::serialize(&h).unwrap();
        let back: BlockHeader = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, h);
    }
}
