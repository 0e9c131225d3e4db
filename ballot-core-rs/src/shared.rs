//! Thread-safe handle to a single registry.
//!
//! Mutations hold the write lock for the whole validate/journal/apply step,
//! so they are serialized and never observed half-done. Reads share the
//! read lock and may run in parallel.

use crate::error::Result;
use crate::registry::BallotRegistry;
use crate::types::{BallotIndex, BallotSnapshot, OptionIndex, Phase, Timestamp, VoterId};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable, shareable registry handle
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<BallotRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: BallotRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn create_ballot(
        &self,
        question: impl Into<String>,
        options: Vec<String>,
        start_time: Timestamp,
        duration: u64,
    ) -> Result<BallotIndex> {
        self.inner
            .write()
            .create_ballot(question, options, start_time, duration)
    }

    pub fn cast(
        &self,
        index: BallotIndex,
        voter: impl Into<VoterId>,
        option: OptionIndex,
    ) -> Result<()> {
        self.inner.write().cast(index, voter, option)
    }

    pub fn has_voted(&self, index: BallotIndex, voter: &str) -> Result<bool> {
        self.inner.read().has_voted(index, voter)
    }

    pub fn get_tally(&self, index: BallotIndex, option: OptionIndex) -> Result<u64> {
        self.inner.read().get_tally(index, option)
    }

    pub fn results(&self, index: BallotIndex) -> Result<Vec<u64>> {
        self.inner.read().results(index)
    }

    pub fn winners(&self, index: BallotIndex) -> Result<Vec<bool>> {
        self.inner.read().winners(index)
    }

    pub fn get_ballot_by_index(&self, index: BallotIndex) -> Result<BallotSnapshot> {
        self.inner.read().get_ballot_by_index(index)
    }

    pub fn phase(&self, index: BallotIndex) -> Result<Phase> {
        self.inner.read().phase(index)
    }

    pub fn ballot_count(&self) -> usize {
        self.inner.read().ballot_count()
    }

    /// Run `f` against a consistent view of the whole registry
    pub fn read<T>(&self, f: impl FnOnce(&BallotRegistry) -> T) -> T {
        f(&self.inner.read())
    }
}
