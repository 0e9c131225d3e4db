//! Ballot registry: append-only, indexed collection of ballots.
//!
//! Every mutation follows the same path:
//! 1. validate against the current state and the injected clock
//! 2. append to the journal (if one is attached)
//! 3. apply in memory and notify the event sink
//!
//! A failure at any step leaves the registry exactly as it was.

use crate::ballot::Ballot;
use crate::clock::Clock;
use crate::error::{BallotError, Result};
use crate::events::{BallotEvent, EventSink};
use crate::storage::{Journal, Storage, StorageConfig, WalEntry};
use crate::types::{BallotIndex, BallotSnapshot, OptionIndex, Phase, Timestamp, VoterId};
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry of ballots
pub struct BallotRegistry {
    ballots: Vec<Ballot>,
    clock: Arc<dyn Clock>,
    /// Observer for creation and vote notifications
    sink: Option<Box<dyn EventSink>>,
    /// Durable record of committed mutations
    journal: Option<Box<dyn Journal>>,
}

impl BallotRegistry {
    /// Create an empty, in-memory registry
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            ballots: Vec::new(),
            clock,
            sink: None,
            journal: None,
        }
    }

    /// Open a file-backed registry, replaying whatever the journal holds
    pub fn open(config: StorageConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut storage = Storage::new(config)?;
        let recovered = storage.open().map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => BallotError::Corrupt(e.to_string()),
            _ => BallotError::Storage(e),
        })?;
        let registry = Self::replay(recovered.entries, clock)?;

        let stats = storage.stats();
        info!(
            "Registry: Opened journal with {} ballots ({} bytes)",
            registry.ballots.len(),
            stats.wal_size
        );
        Ok(registry.with_journal(storage))
    }

    /// Rebuild a registry from journal entries.
    ///
    /// Time windows are not re-checked: each entry was valid when it was
    /// committed. Structural rules (sequential indices, option bounds,
    /// one vote per voter) still apply.
    pub fn replay(entries: Vec<WalEntry>, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut registry = Self::new(clock);
        let count = entries.len();
        for entry in entries {
            registry.apply_entry(entry)?;
        }
        debug!(
            "Registry: Replayed {} entries into {} ballots",
            count,
            registry.ballots.len()
        );
        Ok(registry)
    }

    fn apply_entry(&mut self, entry: WalEntry) -> Result<()> {
        match entry {
            WalEntry::BallotCreated {
                index,
                question,
                options,
                start_time,
                duration,
            } => {
                if index != self.ballots.len() {
                    return Err(BallotError::Corrupt(format!(
                        "ballot {} created out of order (expected {})",
                        index,
                        self.ballots.len()
                    )));
                }
                let ballot = Ballot::from_snapshot(BallotSnapshot {
                    question,
                    options,
                    start_time,
                    duration,
                })
                .map_err(|e| BallotError::Corrupt(format!("ballot {}: {}", index, e)))?;
                self.ballots.push(ballot);
            }
            WalEntry::VoteCast {
                index,
                voter,
                option,
            } => {
                let ballot = self.ballots.get_mut(index).ok_or_else(|| {
                    BallotError::Corrupt(format!("vote for unknown ballot {}", index))
                })?;
                ballot
                    .record(voter, option)
                    .map_err(|e| BallotError::Corrupt(format!("ballot {}: {}", index, e)))?;
            }
        }
        Ok(())
    }

    /// Attach an event sink
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.set_event_sink(sink);
        self
    }

    pub fn set_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Attach a journal. Entries already in the registry are not written.
    pub fn with_journal(mut self, journal: impl Journal + 'static) -> Self {
        self.journal = Some(Box::new(journal));
        self
    }

    /// Current time according to the injected clock
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn append_journal(&mut self, entry: &WalEntry) -> Result<()> {
        if let Some(journal) = self.journal.as_mut() {
            journal.append(entry)?;
        }
        Ok(())
    }

    fn emit(&self, event: BallotEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(&event);
        }
    }

    /// Create a new ballot and return its index
    pub fn create_ballot(
        &mut self,
        question: impl Into<String>,
        options: Vec<String>,
        start_time: Timestamp,
        duration: u64,
    ) -> Result<BallotIndex> {
        let now = self.clock.now();
        let ballot = Ballot::new(question.into(), options, start_time, duration, now)
            .inspect_err(|e| warn!("Registry: Rejected ballot: {}", e))?;
        let index = self.ballots.len();

        self.append_journal(&WalEntry::BallotCreated {
            index,
            question: ballot.question().to_string(),
            options: ballot.options().to_vec(),
            start_time,
            duration,
        })?;
        self.ballots.push(ballot);

        info!(
            "Registry: Created ballot {} ({} options, opens {}, closes {})",
            index,
            self.ballots[index].options().len(),
            start_time,
            self.ballots[index].end_time()
        );
        self.emit(BallotEvent::BallotCreated { index });
        Ok(index)
    }

    /// Record `voter`'s vote for `option` on ballot `index`
    pub fn cast(
        &mut self,
        index: BallotIndex,
        voter: impl Into<VoterId>,
        option: OptionIndex,
    ) -> Result<()> {
        let voter = voter.into();
        let now = self.clock.now();

        self.ballot(index)?
            .check_cast(&voter, option, now)
            .inspect_err(|e| {
                warn!("Registry: Rejected vote on ballot {} from {}: {}", index, voter, e)
            })?;

        self.append_journal(&WalEntry::VoteCast {
            index,
            voter: voter.clone(),
            option,
        })?;
        self.ballots[index].record(voter.clone(), option)?;

        info!(
            "Registry: Ballot {} vote from {} for option {}",
            index, voter, option
        );
        self.emit(BallotEvent::VoteCast {
            index,
            voter,
            option,
        });
        Ok(())
    }

    /// Borrow a ballot
    pub fn ballot(&self, index: BallotIndex) -> Result<&Ballot> {
        self.ballots
            .get(index)
            .ok_or_else(|| BallotError::ballot_out_of_range(index, self.ballots.len()))
    }

    pub fn has_voted(&self, index: BallotIndex, voter: &str) -> Result<bool> {
        Ok(self.ballot(index)?.has_voted(voter))
    }

    pub fn get_tally(&self, index: BallotIndex, option: OptionIndex) -> Result<u64> {
        self.ballot(index)?.tally(option)
    }

    /// Vote counts, index-aligned with the ballot's options
    pub fn results(&self, index: BallotIndex) -> Result<Vec<u64>> {
        Ok(self.ballot(index)?.results().to_vec())
    }

    /// Options holding the maximum tally (ties included)
    pub fn winners(&self, index: BallotIndex) -> Result<Vec<bool>> {
        Ok(self.ballot(index)?.winners())
    }

    pub fn get_ballot_by_index(&self, index: BallotIndex) -> Result<BallotSnapshot> {
        Ok(self.ballot(index)?.snapshot())
    }

    /// Lifecycle phase of a ballot right now
    pub fn phase(&self, index: BallotIndex) -> Result<Phase> {
        let now = self.clock.now();
        Ok(self.ballot(index)?.phase(now))
    }

    pub fn ballot_count(&self) -> usize {
        self.ballots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::IndexKind;
    use crate::events::RecordingSink;
    use crate::storage::MemoryStorage;
    use std::io;

    const START: Timestamp = 1_700_000_000;

    fn options() -> Vec<String> {
        ["Tupac Shakur", "The Notorious B.I.G.", "Eminem", "Jay-Z"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn setup() -> (Arc<ManualClock>, BallotRegistry) {
        let clock = Arc::new(ManualClock::new(START));
        let registry = BallotRegistry::new(clock.clone());
        (clock, registry)
    }

    struct FailingJournal;

    impl Journal for FailingJournal {
        fn append(&mut self, _entry: &WalEntry) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_indices_are_sequential() {
        let (_clock, mut registry) = setup();
        for expected in 0..3 {
            let index = registry
                .create_ballot("Q", options(), START + 60, 300)
                .unwrap();
            assert_eq!(index, expected);
        }
        assert_eq!(registry.ballot_count(), 3);
    }

    #[test]
    fn test_rejected_creation_adds_nothing() {
        let (_clock, mut registry) = setup();
        assert!(registry.create_ballot("Q", options(), START, 300).is_err());
        assert_eq!(registry.ballot_count(), 0);

        // Next successful creation still gets index 0
        let index = registry.create_ballot("Q", options(), START + 1, 1).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_unknown_ballot() {
        let (_clock, mut registry) = setup();
        let err = registry.cast(0, "alice", 0).unwrap_err();
        assert!(matches!(
            err,
            BallotError::OutOfRange {
                kind: IndexKind::Ballot,
                index: 0,
                len: 0
            }
        ));
        assert!(registry.results(5).is_err());
        assert!(registry.winners(5).is_err());
        assert!(registry.has_voted(5, "alice").is_err());
        assert!(registry.get_ballot_by_index(5).is_err());
        assert!(registry.phase(5).is_err());
    }

    #[test]
    fn test_phase_follows_clock() {
        let (clock, mut registry) = setup();
        let index = registry.create_ballot("Q", options(), START + 60, 300).unwrap();

        assert_eq!(registry.phase(index).unwrap(), Phase::Pending);
        clock.advance(60);
        assert_eq!(registry.phase(index).unwrap(), Phase::Open);
        clock.advance(300);
        assert_eq!(registry.phase(index).unwrap(), Phase::Open);
        clock.advance(1);
        assert_eq!(registry.phase(index).unwrap(), Phase::Closed);
    }

    #[test]
    fn test_events_emitted_on_commit_only() {
        let sink = Arc::new(RecordingSink::new());
        let (clock, registry) = setup();
        let mut registry = registry.with_event_sink(sink.clone());

        let index = registry.create_ballot("Q", options(), START + 60, 300).unwrap();
        assert!(registry.cast(index, "alice", 0).is_err());
        clock.advance(61);
        registry.cast(index, "alice", 2).unwrap();
        assert!(registry.cast(index, "alice", 1).is_err());

        assert_eq!(
            sink.events(),
            vec![
                BallotEvent::BallotCreated { index: 0 },
                BallotEvent::VoteCast {
                    index: 0,
                    voter: "alice".to_string(),
                    option: 2
                },
            ]
        );
    }

    #[test]
    fn test_journal_failure_leaves_state_unchanged() {
        let (clock, mut registry) = setup();
        let index = registry.create_ballot("Q", options(), START + 60, 300).unwrap();
        clock.advance(61);

        let mut registry = registry.with_journal(FailingJournal);
        let err = registry.cast(index, "alice", 0).unwrap_err();
        assert!(matches!(err, BallotError::Storage(_)));
        assert!(!registry.has_voted(index, "alice").unwrap());
        assert_eq!(registry.results(index).unwrap(), vec![0, 0, 0, 0]);

        assert!(registry.create_ballot("Q", options(), START + 600, 300).is_err());
        assert_eq!(registry.ballot_count(), 1);
    }

    #[test]
    fn test_replay_reproduces_state() {
        let journal = MemoryStorage::new();
        let (clock, registry) = setup();
        let mut registry = registry.with_journal(journal.clone());

        let index = registry.create_ballot("Q", options(), START + 60, 300).unwrap();
        clock.advance(200);
        for (voter, option) in [("a", 0), ("b", 0), ("c", 1), ("d", 2), ("e", 2)] {
            registry.cast(index, voter, option).unwrap();
        }
        // Rejected casts are never journaled
        assert!(registry.cast(index, "a", 3).is_err());
        assert_eq!(journal.entries().len(), 6);

        // Replay long after the window closed
        clock.advance(10_000);
        let replayed = BallotRegistry::replay(journal.recover().entries, clock.clone()).unwrap();
        assert_eq!(replayed.results(index).unwrap(), vec![2, 1, 2, 0]);
        assert_eq!(
            replayed.winners(index).unwrap(),
            vec![true, false, true, false]
        );
        assert!(replayed.has_voted(index, "e").unwrap());
        assert_eq!(
            replayed.get_ballot_by_index(index).unwrap(),
            registry.get_ballot_by_index(index).unwrap()
        );
    }

    #[test]
    fn test_replay_rejects_inconsistent_journal() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(START));
        let created = |index| WalEntry::BallotCreated {
            index,
            question: "Q".to_string(),
            options: options(),
            start_time: START + 60,
            duration: 300,
        };
        let vote = |voter: &str, option| WalEntry::VoteCast {
            index: 0,
            voter: voter.to_string(),
            option,
        };

        let cases = vec![
            vec![created(1)],
            vec![vote("a", 0)],
            vec![created(0), vote("a", 0), vote("a", 1)],
            vec![created(0), vote("a", 9)],
        ];
        for entries in cases {
            let err = BallotRegistry::replay(entries, clock.clone()).err();
            assert!(matches!(err, Some(BallotError::Corrupt(_))));
        }
    }
}
