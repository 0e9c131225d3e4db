//! Error types for ballot operations

use crate::types::{Timestamp, VoterId};
use std::fmt;
use std::io;
use thiserror::Error;

/// Which index was out of bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Ballot,
    Option,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Ballot => write!(f, "ballot"),
            IndexKind::Option => write!(f, "option"),
        }
    }
}

/// Errors returned by registry operations
#[derive(Debug, Error)]
pub enum BallotError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    #[error("ballot not yet open (opens at {start_time}, now {now})")]
    NotYetOpen { start_time: Timestamp, now: Timestamp },

    #[error("ballot already closed (closed at {end_time}, now {now})")]
    AlreadyClosed { end_time: Timestamp, now: Timestamp },

    #[error("voter {voter} already cast a vote on this ballot")]
    DuplicateVote { voter: VoterId },

    #[error("{kind} index {index} out of range (len {len})")]
    OutOfRange {
        kind: IndexKind,
        index: usize,
        len: usize,
    },

    #[error("tally overflow")]
    Overflow,

    #[error("journal error: {0}")]
    Storage(#[from] io::Error),

    #[error("corrupt journal: {0}")]
    Corrupt(String),
}

impl BallotError {
    pub(crate) fn ballot_out_of_range(index: usize, len: usize) -> Self {
        BallotError::OutOfRange {
            kind: IndexKind::Ballot,
            index,
            len,
        }
    }

    pub(crate) fn option_out_of_range(index: usize, len: usize) -> Self {
        BallotError::OutOfRange {
            kind: IndexKind::Option,
            index,
            len,
        }
    }
}

pub type Result<T> = std::result::Result<T, BallotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BallotError::InvalidConfiguration("duration must be positive");
        assert_eq!(err.to_string(), "invalid configuration: duration must be positive");

        let err = BallotError::option_out_of_range(7, 4);
        assert_eq!(err.to_string(), "option index 7 out of range (len 4)");
    }
}
