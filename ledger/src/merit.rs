//! The Merit chain: an append-only sequence of mined blocks, each finalizing
//! a set of consensus slots.

use std::collections::BTreeSet;

use merit_consensus::Consensus;
use merit_crypto::SignatureScheme;
use merit_types::{ChainParams, Difficulty, PublicKey, Timestamp};
use merit_work::retarget;

use crate::genesis::genesis_block;
use crate::{Block, BlockBody, BlockHeader, LedgerError, Record};

/// Whatever validates the transactions side of a block.
///
/// The chain treats it as opaque: `check_block` either accepts the block or
/// explains why not.
pub trait TransactionsContext {
    fn check_block(&self, block: &Block) -> Result<(), String>;
}

/// A context that accepts every block.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTransactions;

impl TransactionsContext for NoTransactions {
    fn check_block(&self, _block: &Block) -> Result<(), String> {
        Ok(())
    }
}

/// Result of a successful [`Merit::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    Appended,
    /// The block was already part of the chain; nothing changed.
    Duplicate,
}

/// Appended blocks plus the difficulty the next block must meet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty: Difficulty,
}

impl Blockchain {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The tip. Never empty: the genesis block is always present.
    pub fn last(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn height(&self) -> u64 {
        self.last().height()
    }

    pub fn block(&self, height: u64) -> Option<&Block> {
        usize::try_from(height).ok().and_then(|i| self.blocks.get(i))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Merit {
    params: ChainParams,
    blockchain: Blockchain,
}

impl Merit {
    /// A chain holding only the genesis block.
    pub fn new(params: ChainParams) -> Self {
        let blockchain = Blockchain {
            blocks: vec![genesis_block(&params)],
            difficulty: params.initial_difficulty,
        };
        Self { params, blockchain }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn tip(&self) -> &Block {
        self.blockchain.last()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.blockchain.difficulty
    }

    pub fn height(&self) -> u64 {
        self.blockchain.height()
    }

    pub fn block(&self, height: u64) -> Option<&Block> {
        self.blockchain.block(height)
    }

    /// An unmined block on top of the tip that finalizes `entries`.
    ///
    /// Merkle roots and the aggregate are taken from `consensus`, so the
    /// block passes the commitment checks in [`Merit::add`] once mined.
    pub fn prepare_block<S: SignatureScheme>(
        &self,
        scheme: &S,
        consensus: &Consensus,
        entries: &[(PublicKey, u64)],
        time: Timestamp,
    ) -> Result<Block, LedgerError> {
        let mut records = Vec::with_capacity(entries.len());
        for (holder, nonce) in entries {
            records.push(Record {
                holder: holder.clone(),
                nonce: *nonce,
                merkle: consensus.get_merkle(holder, *nonce)?,
            });
        }
        let aggregate = consensus.get_aggregate(scheme, entries)?;
        let tip = self.tip();
        let header = BlockHeader::new(tip.height() + 1, tip.hash(), time, aggregate);
        Ok(Block::new(header, BlockBody::new(records)))
    }

    /// Validate `block` against the tip and `consensus`, then append it.
    ///
    /// Every check runs before anything is written, so on error neither the
    /// chain nor `consensus` has changed.
    pub fn add<S: SignatureScheme, T: TransactionsContext>(
        &mut self,
        scheme: &S,
        transactions: &T,
        consensus: &mut Consensus,
        block: Block,
    ) -> Result<BlockOutcome, LedgerError> {
        if self.is_appended(&block) {
            tracing::trace!(height = block.height(), hash = %block.hash(), "duplicate block");
            return Ok(BlockOutcome::Duplicate);
        }

        let result = self
            .check_extends_tip(&block.header)
            .and_then(|()| self.check_work(&block.header))
            .and_then(|()| check_commitments(scheme, consensus, &block))
            .and_then(|()| transactions.check_block(&block).map_err(LedgerError::Transactions));
        if let Err(e) = result {
            tracing::warn!(height = block.height(), hash = %block.hash(), error = %e, "block rejected");
            return Err(e);
        }

        for record in block.body.records() {
            consensus.archive(&record.holder, record.nonce, record.merkle);
        }
        tracing::debug!(
            height = block.height(),
            hash = %block.hash(),
            records = block.body.records().len(),
            "block appended"
        );
        self.append(block);
        Ok(BlockOutcome::Appended)
    }

    /// Whether this exact block, body included, is already on the chain.
    /// The header does not commit to the body's records.
    fn is_appended(&self, block: &Block) -> bool {
        self.block(block.height()).is_some_and(|existing| existing == block)
    }

    fn check_extends_tip(&self, header: &BlockHeader) -> Result<(), LedgerError> {
        let tip = self.tip();
        if header.height() != tip.height() + 1 {
            return Err(LedgerError::InvalidLinkage {
                height: header.height(),
                reason: format!("expected height {}", tip.height() + 1),
            });
        }
        if header.previous_hash() != tip.hash() {
            return Err(LedgerError::InvalidLinkage {
                height: header.height(),
                reason: format!("previous hash {} is not the tip {}", header.previous_hash(), tip.hash()),
            });
        }
        Ok(())
    }

    fn check_work(&self, header: &BlockHeader) -> Result<(), LedgerError> {
        let hash = header.compute_hash();
        if hash != header.hash() || !self.difficulty().is_met_by(&hash) {
            return Err(LedgerError::InsufficientWork {
                height: header.height(),
                hash,
            });
        }
        Ok(())
    }

    /// Push a checked block and retarget at period boundaries.
    fn append(&mut self, block: Block) {
        let height = block.height();
        self.blockchain.blocks.push(block);

        let period = self.params.retarget_period;
        if period == 0 || height % period != 0 {
            return;
        }
        let (Some(start), Some(end)) = (self.block(height - period), self.block(height)) else {
            return;
        };
        let elapsed = start.header.time().elapsed_since(end.header.time());
        let previous = self.blockchain.difficulty;
        self.blockchain.difficulty = retarget(previous, elapsed, self.params.target_period_secs());
        tracing::info!(
            height,
            elapsed,
            previous = %previous,
            difficulty = %self.blockchain.difficulty,
            "difficulty retargeted"
        );
    }

    /// Append a block from a trusted record: linkage and work are checked,
    /// consensus commitments are not.
    pub(crate) fn replay(&mut self, block: Block) -> Result<(), LedgerError> {
        self.check_extends_tip(&block.header)?;
        self.check_work(&block.header)?;
        self.append(block);
        Ok(())
    }
}

fn check_commitments<S: SignatureScheme>(
    scheme: &S,
    consensus: &Consensus,
    block: &Block,
) -> Result<(), LedgerError> {
    let mut seen = BTreeSet::new();
    for record in block.body.records() {
        let (holder, nonce) = (&record.holder, record.nonce);
        if !seen.insert((holder, nonce)) {
            return Err(LedgerError::InvalidCommitment(format!(
                "slot {holder}/{nonce} committed twice"
            )));
        }
        if consensus.is_archived(holder, nonce) {
            return Err(LedgerError::InvalidCommitment(format!(
                "slot {holder}/{nonce} already finalized"
            )));
        }

        let unverified = || LedgerError::UnverifiedElement {
            holder: holder.clone(),
            nonce,
        };
        let elements = consensus.elements(holder, nonce);
        if elements.is_empty() || !elements.iter().all(|e| e.verify(scheme)) {
            return Err(unverified());
        }
        if consensus.is_removed(holder) && !consensus.only_removals(holder, nonce) {
            return Err(unverified());
        }

        let merkle = consensus.get_merkle(holder, nonce)?;
        if merkle != record.merkle {
            return Err(LedgerError::InvalidCommitment(format!(
                "slot {holder}/{nonce} merkle {} does not match {merkle}",
                record.merkle
            )));
        }
    }

    let aggregate = consensus.get_aggregate(scheme, &block.body.entries())?;
    if &aggregate != block.header.aggregate() {
        return Err(LedgerError::InvalidCommitment(
            "header aggregate does not match the committed elements".to_string(),
        ));
    }
    Ok(())
}
