//! Background block production.
//!
//! Each round optionally attests to the tip as the local validator, collects
//! every finalizable slot, and mines a block over them on the blocking pool.
//! A round can be abandoned (e.g. because a competing block arrived) and the
//! whole loop stops on shutdown, cancelling the in-flight search.

use std::sync::{Arc, Mutex};

use merit_crypto::SignatureScheme;
use merit_ledger::{Block, LedgerError};
use merit_types::{KeyPair, Timestamp};
use merit_work::{CancelToken, WorkError};
use crate::{Engine, NodeError, ShutdownSignal};

pub struct Miner<S> {
    engine: Arc<Engine<S>>,
    validator: Option<KeyPair>,
    current: Mutex<CancelToken>,
}

impl<S: SignatureScheme + 'static> Miner<S> {
    pub fn new(engine: Arc<Engine<S>>) -> Self {
        Self {
            engine,
            validator: None,
            current: Mutex::new(CancelToken::new()),
        }
    }

    /// Attest to the tip as `validator` at the start of every round.
    pub fn with_validator(mut self, validator: KeyPair) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Cancel the search of the round in flight. The loop starts a new
    /// round over a fresh template.
    pub fn abandon(&self) {
        if let Ok(current) = self.current.lock() {
            current.cancel();
        }
    }

    /// Mine one block over everything currently finalizable.
    pub async fn mine_round(&self, cancel: CancelToken) -> Result<Block, NodeError> {
        *self.current.lock().map_err(|_| NodeError::Poisoned)? = cancel.clone();

        if let Some(validator) = &self.validator {
            self.engine.attest(validator)?;
        }
        let entries = self.engine.finalizable_entries()?;
        let time = Timestamp::now().max(self.engine.tip()?.header.time());

        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.mine_block(&entries, time, &cancel))
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?
    }

    /// Mine until `rounds` blocks are appended (forever if `None`) or
    /// shutdown is signalled. Returns the number of blocks mined.
    pub async fn run(
        &self,
        rounds: Option<u64>,
        mut shutdown: ShutdownSignal,
    ) -> Result<u64, NodeError> {
        let mut mined = 0;
        while rounds.map_or(true, |n| mined < n) {
            let cancel = CancelToken::new();
            tokio::select! {
                result = self.mine_round(cancel.clone()) => match result {
                    Ok(block) => {
                        mined += 1;
                        tracing::info!(
                            height = block.height(),
                            hash = %block.hash(),
                            records = block.body.records().len(),
                            "mined block"
                        );
                    }
                    Err(NodeError::Stale { height }) => {
                        tracing::debug!(height, "tip moved, restarting round");
                    }
                    Err(NodeError::Ledger(LedgerError::Work(WorkError::Cancelled))) => {
                        tracing::debug!("round abandoned");
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    cancel.cancel();
                    tracing::info!(mined, "miner stopping");
                    break;
                }
            }
        }
        Ok(mined)
    }
}
