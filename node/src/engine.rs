//! The chain engine: one lock around the chain and the consensus registry.
//!
//! Every mutation of either structure goes through [`Engine`], which holds a
//! single mutex over both. A block is therefore always checked against a
//! registry that cannot change underneath it. Proof search is the exception:
//! [`Engine::mine_block`] builds its template under the lock, releases it for
//! the search, and takes it again only to submit the result.

use std::sync::{Mutex, MutexGuard};

use merit_consensus::{AddOutcome, Consensus, SignedElement, Verification};
use merit_crypto::SignatureScheme;
use merit_ledger::{mine, Block, BlockHeader, BlockOutcome, Merit, NoTransactions, StateSnapshot};
use merit_types::{ChainParams, Difficulty, KeyPair, PublicKey, Timestamp};
use merit_work::{CancelToken, WorkGenerator};

use crate::NodeError;

struct ChainState {
    merit: Merit,
    consensus: Consensus,
}

/// An unmined block plus what it was built against.
struct Template {
    block: Block,
    difficulty: Difficulty,
    removed: usize,
}

pub struct Engine<S> {
    scheme: S,
    generator: WorkGenerator,
    state: Mutex<ChainState>,
}

impl<S: SignatureScheme> Engine<S> {
    /// A fresh chain holding only the genesis block.
    pub fn new(scheme: S, params: ChainParams, work_threads: usize) -> Self {
        Self::from_parts(scheme, Merit::new(params), Consensus::new(), work_threads)
    }

    /// An engine over a previously saved state, replayed under `params`.
    pub fn from_snapshot(
        scheme: S,
        snapshot: StateSnapshot,
        params: ChainParams,
        work_threads: usize,
    ) -> Result<Self, NodeError> {
        let (merit, consensus) = snapshot.restore(params)?;
        Ok(Self::from_parts(scheme, merit, consensus, work_threads))
    }

    fn from_parts(scheme: S, merit: Merit, consensus: Consensus, work_threads: usize) -> Self {
        Self {
            scheme,
            generator: WorkGenerator::new(work_threads),
            state: Mutex::new(ChainState { merit, consensus }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChainState>, NodeError> {
        self.state.lock().map_err(|_| NodeError::Poisoned)
    }

    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    pub fn add_element(&self, element: SignedElement) -> Result<AddOutcome, NodeError> {
        let mut state = self.lock()?;
        Ok(state.consensus.add(&self.scheme, element)?)
    }

    pub fn add_block(&self, block: Block) -> Result<BlockOutcome, NodeError> {
        let mut state = self.lock()?;
        let ChainState { merit, consensus } = &mut *state;
        Ok(merit.add(&self.scheme, &NoTransactions, consensus, block)?)
    }

    /// Sign a verification of the current tip as `validator` at its next
    /// nonce and register it.
    pub fn attest(&self, validator: &KeyPair) -> Result<SignedElement, NodeError> {
        let mut state = self.lock()?;
        let nonce = state.consensus.next_nonce(&validator.public);
        let tip = state.merit.tip().hash();
        let element = Verification::new(validator.public.clone(), nonce, tip)
            .sign(&self.scheme, &validator.private)?;
        state.consensus.add(&self.scheme, element.clone())?;
        Ok(element)
    }

    /// Unmined block on the tip finalizing `entries`.
    pub fn prepare_block(&self, entries: &[(PublicKey, u64)], time: Timestamp) -> Result<Block, NodeError> {
        let state = self.lock()?;
        Ok(state.merit.prepare_block(&self.scheme, &state.consensus, entries, time)?)
    }

    /// Slots that are registered, not yet finalized, and committable: the
    /// holder is not removed, or the slot holds only Merit Removals.
    pub fn finalizable_entries(&self) -> Result<Vec<(PublicKey, u64)>, NodeError> {
        let state = self.lock()?;
        let consensus = &state.consensus;
        let entries = consensus
            .slots()
            .filter(|(holder, nonce)| !consensus.is_archived(holder, *nonce))
            .filter(|(holder, nonce)| !consensus.is_removed(holder) || consensus.only_removals(holder, *nonce))
            .map(|(holder, nonce)| (holder.clone(), nonce))
            .collect();
        Ok(entries)
    }

    /// Prepare, mine and submit a block finalizing `entries`.
    ///
    /// The lock is not held during the search. If another block lands on
    /// the tip meanwhile, or the registry changes under the template, the
    /// mined block is discarded with [`NodeError::Stale`].
    pub fn mine_block(
        &self,
        entries: &[(PublicKey, u64)],
        time: Timestamp,
        cancel: &CancelToken,
    ) -> Result<Block, NodeError> {
        let template = self.template(entries, time)?;
        let header = mine(&template.block.header, template.difficulty, &self.generator, cancel)?;
        self.submit(template, header, entries, time)
    }

    fn template(&self, entries: &[(PublicKey, u64)], time: Timestamp) -> Result<Template, NodeError> {
        let state = self.lock()?;
        Ok(Template {
            block: state.merit.prepare_block(&self.scheme, &state.consensus, entries, time)?,
            difficulty: state.merit.difficulty(),
            removed: state.consensus.removed().count(),
        })
    }

    fn submit(
        &self,
        template: Template,
        header: BlockHeader,
        entries: &[(PublicKey, u64)],
        time: Timestamp,
    ) -> Result<Block, NodeError> {
        let block = Block::new(header, template.block.body);
        let stale = || NodeError::Stale {
            height: block.height() - 1,
        };

        let mut state = self.lock()?;
        if state.merit.tip().hash() != block.header.previous_hash() {
            tracing::debug!(height = block.height(), "tip moved, discarding block");
            return Err(stale());
        }
        // The removed set only grows, so its size tells whether it moved.
        let unchanged = state.consensus.removed().count() == template.removed
            && state
                .merit
                .prepare_block(&self.scheme, &state.consensus, entries, time)
                .is_ok_and(|fresh| {
                    fresh.body == block.body && fresh.header.aggregate() == block.header.aggregate()
                });
        if !unchanged {
            tracing::debug!(height = block.height(), "registry changed, discarding block");
            return Err(stale());
        }

        let ChainState { merit, consensus } = &mut *state;
        merit.add(&self.scheme, &NoTransactions, consensus, block.clone())?;
        Ok(block)
    }

    pub fn snapshot(&self) -> Result<StateSnapshot, NodeError> {
        let state = self.lock()?;
        Ok(StateSnapshot::capture(&state.merit, &state.consensus))
    }

    pub fn tip(&self) -> Result<Block, NodeError> {
        Ok(self.lock()?.merit.tip().clone())
    }

    pub fn height(&self) -> Result<u64, NodeError> {
        Ok(self.lock()?.merit.height())
    }

    pub fn difficulty(&self) -> Result<Difficulty, NodeError> {
        Ok(self.lock()?.merit.difficulty())
    }

    pub fn removed(&self) -> Result<Vec<PublicKey>, NodeError> {
        Ok(self.lock()?.consensus.removed().cloned().collect())
    }
}
