//! Single ballot: fixed question, options and voting window, plus its
//! vote ledger.
//!
//! The lifecycle (pending, open, closed) is never stored. Every check
//! recomputes it from `start_time`, `end_time` and the caller's `now`.

use crate::error::{BallotError, Result};
use crate::types::{BallotSnapshot, OptionIndex, Phase, Timestamp, VoterId};
use std::collections::HashSet;

/// Minimum number of options a ballot must offer
pub const MIN_OPTIONS: usize = 2;

/// A ballot and its vote ledger
#[derive(Debug, Clone)]
pub struct Ballot {
    question: String,
    options: Vec<String>,
    start_time: Timestamp,
    duration: u64,
    /// Votes per option, index-aligned with `options`
    tally: Vec<u64>,
    /// Everyone who has voted on this ballot
    voters: HashSet<VoterId>,
}

impl Ballot {
    /// Create a ballot, rejecting schedules that do not start after `now`
    pub fn new(
        question: String,
        options: Vec<String>,
        start_time: Timestamp,
        duration: u64,
        now: Timestamp,
    ) -> Result<Self> {
        if options.len() < MIN_OPTIONS {
            return Err(BallotError::InvalidConfiguration(
                "at minimum two options required",
            ));
        }
        if start_time <= now {
            return Err(BallotError::InvalidConfiguration(
                "start time must be in the future",
            ));
        }
        Self::from_snapshot(BallotSnapshot {
            question,
            options,
            start_time,
            duration,
        })
    }

    /// Rebuild an empty ballot from its creation-time fields.
    ///
    /// Used when replaying a journal, where the start time was already in
    /// the future when the ballot was first created.
    pub(crate) fn from_snapshot(snapshot: BallotSnapshot) -> Result<Self> {
        let BallotSnapshot {
            question,
            options,
            start_time,
            duration,
        } = snapshot;

        if options.len() < MIN_OPTIONS {
            return Err(BallotError::InvalidConfiguration(
                "at minimum two options required",
            ));
        }
        if duration == 0 {
            return Err(BallotError::InvalidConfiguration(
                "duration must be positive",
            ));
        }
        if start_time.checked_add(duration).is_none() {
            return Err(BallotError::InvalidConfiguration("end time overflows"));
        }

        let tally = vec![0; options.len()];
        Ok(Self {
            question,
            options,
            start_time,
            duration,
            tally,
            voters: HashSet::new(),
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Last instant at which votes are accepted
    pub fn end_time(&self) -> Timestamp {
        // Overflow rejected at construction
        self.start_time + self.duration
    }

    pub fn phase(&self, now: Timestamp) -> Phase {
        Phase::at(self.start_time, self.end_time(), now)
    }

    /// Check whether `voter` may vote for `option` at `now` without
    /// touching the ledger.
    ///
    /// Order: not yet open, already closed, duplicate voter, option range.
    pub fn check_cast(&self, voter: &str, option: OptionIndex, now: Timestamp) -> Result<()> {
        match self.phase(now) {
            Phase::Pending => {
                return Err(BallotError::NotYetOpen {
                    start_time: self.start_time,
                    now,
                })
            }
            Phase::Closed => {
                return Err(BallotError::AlreadyClosed {
                    end_time: self.end_time(),
                    now,
                })
            }
            Phase::Open => {}
        }
        self.check_ledger(voter, option)
    }

    fn check_ledger(&self, voter: &str, option: OptionIndex) -> Result<()> {
        if self.voters.contains(voter) {
            return Err(BallotError::DuplicateVote {
                voter: voter.to_string(),
            });
        }
        let count = self
            .tally
            .get(option)
            .ok_or_else(|| BallotError::option_out_of_range(option, self.options.len()))?;
        if count.checked_add(1).is_none() {
            return Err(BallotError::Overflow);
        }
        Ok(())
    }

    /// Add a vote to the ledger. Either both the voter and the count are
    /// recorded or nothing is.
    pub(crate) fn record(&mut self, voter: VoterId, option: OptionIndex) -> Result<()> {
        self.check_ledger(&voter, option)?;
        self.tally[option] += 1;
        self.voters.insert(voter);
        Ok(())
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.voters.contains(voter)
    }

    pub fn tally(&self, option: OptionIndex) -> Result<u64> {
        self.tally
            .get(option)
            .copied()
            .ok_or_else(|| BallotError::option_out_of_range(option, self.options.len()))
    }

    pub fn results(&self) -> &[u64] {
        &self.tally
    }

    /// Marks every option whose tally equals the maximum. Ties yield
    /// several winners; with no votes every option is a winner.
    pub fn winners(&self) -> Vec<bool> {
        let max = self.tally.iter().copied().max().unwrap_or(0);
        self.tally.iter().map(|&count| count == max).collect()
    }

    /// Number of voters who have cast on this ballot
    pub fn vote_count(&self) -> usize {
        self.voters.len()
    }

    pub fn snapshot(&self) -> BallotSnapshot {
        BallotSnapshot {
            question: self.question.clone(),
            options: self.options.clone(),
            start_time: self.start_time,
            duration: self.duration,
        }
    }
}
