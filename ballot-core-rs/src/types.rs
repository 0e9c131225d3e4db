//! Core types for the ballot registry

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Position of a ballot in the registry (assigned at creation, never reused)
pub type BallotIndex = usize;

/// Position of an option within a ballot
pub type OptionIndex = usize;

/// Opaque identifier of a voter (e.g. an account address)
pub type VoterId = String;

/// Lifecycle phase of a ballot, derived from the clock on every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Voting has not started yet
    Pending,
    /// Voting window is open (inclusive on both ends)
    Open,
    /// Voting window has passed
    Closed,
}

impl Phase {
    /// Compute the phase of a `[start_time, end_time]` window at `now`
    pub fn at(start_time: Timestamp, end_time: Timestamp, now: Timestamp) -> Self {
        if now < start_time {
            Phase::Pending
        } else if now > end_time {
            Phase::Closed
        } else {
            Phase::Open
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pending => write!(f, "pending"),
            Phase::Open => write!(f, "open"),
            Phase::Closed => write!(f, "closed"),
        }
    }
}

/// Creation-time fields of a ballot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotSnapshot {
    pub question: String,
    pub options: Vec<String>,
    pub start_time: Timestamp,
    pub duration: u64,
}

/// Current Unix timestamp in seconds
pub fn unix_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
