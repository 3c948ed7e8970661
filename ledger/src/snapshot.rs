//! State snapshots: the whole chain plus the consensus registry.
//!
//! The snapshot stores blocks, not derived state. Restoring replays the chain
//! from genesis so the difficulty in force at each height is recomputed, and a
//! record that does not replay cleanly is rejected.

use std::collections::BTreeSet;

use merit_consensus::Consensus;
use merit_types::ChainParams;
use serde::{Deserialize, Serialize};

use crate::genesis::genesis_block;
use crate::{Block, LedgerError, Merit};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub blockchain: Vec<Block>,
    pub consensus: Consensus,
}

impl StateSnapshot {
    pub fn capture(merit: &Merit, consensus: &Consensus) -> Self {
        Self {
            blockchain: merit.blockchain().blocks().to_vec(),
            consensus: consensus.clone(),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, LedgerError> {
        serde_json::to_value(self).map_err(|e| LedgerError::MalformedRecord(e.to_string()))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, LedgerError> {
        Self::deserialize(value).map_err(|e| LedgerError::MalformedRecord(e.to_string()))
    }

    /// Rebuild the chain and registry under `params`.
    ///
    /// Checks that the record starts at this network's genesis, that every
    /// block links to its parent and meets the difficulty in force at its
    /// height, and that the registry's archived slots are exactly the slots
    /// the blocks finalize, each archived at the Merkle root its block
    /// committed to.
    pub fn restore(self, params: ChainParams) -> Result<(Merit, Consensus), LedgerError> {
        let malformed = LedgerError::MalformedRecord;

        let mut blocks = self.blockchain.into_iter();
        let genesis = blocks
            .next()
            .ok_or_else(|| malformed("record holds no blocks".to_string()))?;
        if genesis != genesis_block(&params) {
            return Err(malformed(format!(
                "genesis {} does not belong to network {}",
                genesis.hash(),
                params.network_id
            )));
        }

        let consensus = self.consensus;
        let mut merit = Merit::new(params);
        let mut finalized = BTreeSet::new();
        for block in blocks {
            let height = block.height();
            for record in block.body.records() {
                let (holder, nonce) = (&record.holder, record.nonce);
                if !finalized.insert((holder.clone(), nonce)) {
                    return Err(malformed(format!(
                        "block {height}: slot {holder}/{nonce} finalized twice"
                    )));
                }
                match consensus.archived_merkle(holder, nonce) {
                    None => {
                        return Err(malformed(format!(
                            "block {height}: slot {holder}/{nonce} is not archived"
                        )))
                    }
                    Some(merkle) if merkle != record.merkle => {
                        return Err(malformed(format!(
                            "block {height}: slot {holder}/{nonce} merkle mismatch"
                        )))
                    }
                    Some(_) => {}
                }
            }
            merit
                .replay(block)
                .map_err(|e| malformed(format!("block {height}: {e}")))?;
        }

        if let Some((holder, nonce)) = consensus
            .archived_slots()
            .find(|(holder, nonce)| !finalized.contains(&((*holder).clone(), *nonce)))
        {
            return Err(malformed(format!(
                "slot {holder}/{nonce} is archived but no block finalizes it"
            )));
        }

        tracing::debug!(
            height = merit.height(),
            difficulty = %merit.difficulty(),
            "state restored"
        );
        Ok((merit, consensus))
    }
}
