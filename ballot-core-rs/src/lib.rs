//! Ballot Core Library
//!
//! Time-windowed, single-choice ballots: create a ballot with a question,
//! options and a voting window; each voter casts at most one vote while the
//! window is open; tallies and (tie-aware) winners can be read at any time.

pub mod types;
pub mod error;
pub mod clock;
pub mod events;
pub mod ballot;
pub mod storage;
pub mod registry;
pub mod shared;

pub use types::*;
pub use error::{BallotError, IndexKind, Result};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{BallotEvent, ChannelSink, EventSink, RecordingSink, TracingSink};
pub use ballot::Ballot;
pub use storage::{Journal, MemoryStorage, Storage, StorageConfig, WalEntry};
pub use registry::BallotRegistry;
pub use shared::SharedRegistry;
