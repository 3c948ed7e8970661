//! Proof search (multi-threaded CPU).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use merit_types::{Difficulty, Hash};
use rayon::prelude::*;

use crate::WorkError;

/// Batch size per thread before checking the cancellation flags.
const BATCH_SIZE: u64 = 4096;

/// Something whose hash depends on a proof value.
///
/// `hash_with_proof` must be pure: the same proof always yields the same hash.
pub trait Candidate: Sync {
    fn hash_with_proof(&self, proof: u64) -> Hash;
}

/// Signals an in-flight search to stop.
///
/// Clones share the flag, so a controller keeps one clone and hands another
/// to the search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Searches for a proof value whose hash meets a difficulty.
#[derive(Clone, Copy, Debug)]
pub struct WorkGenerator {
    threads: usize,
}

impl Default for WorkGenerator {
    fn default() -> Self {
        Self::new(rayon::current_num_threads())
    }
}

impl WorkGenerator {
    /// A generator splitting the search across `threads` workers (at least one).
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Find a proof `>= start` whose hash meets `difficulty`.
    ///
    /// Worker `t` examines `start + t`, `start + t + threads`, ... so the
    /// workers cover disjoint proof ranges. The first worker to succeed
    /// signals the others to stop. The result is the smallest valid proof any
    /// worker found, not necessarily the smallest valid proof overall.
    pub fn search<C: Candidate>(
        &self,
        candidate: &C,
        difficulty: Difficulty,
        start: u64,
        cancel: &CancelToken,
    ) -> Result<u64, WorkError> {
        let found = AtomicU64::new(u64::MAX);
        let done = AtomicBool::new(false);
        let stride = self.threads as u64;

        let run = || {
            (0..self.threads).into_par_iter().for_each(|thread_id| {
                let Some(mut proof) = start.checked_add(thread_id as u64) else {
                    return;
                };

                loop {
                    if done.load(Ordering::Relaxed) || cancel.is_cancelled() {
                        return;
                    }

                    for _ in 0..BATCH_SIZE {
                        if difficulty.is_met_by(&candidate.hash_with_proof(proof)) {
                            found.fetch_min(proof, Ordering::Relaxed);
                            done.store(true, Ordering::Relaxed);
                            return;
                        }
                        proof = match proof.checked_add(stride) {
                            Some(next) => next,
                            None => return,
                        };
                    }
                }
            });
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(_) => run(),
        }

        if done.load(Ordering::Relaxed) {
            Ok(found.load(Ordering::Relaxed))
        } else if cancel.is_cancelled() {
            Err(WorkError::Cancelled)
        } else {
            Err(WorkError::Exhausted { start })
        }
    }
}
