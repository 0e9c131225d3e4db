//! File-backed registry survives a restart.

use ballot_core::*;
use std::io;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn reopened_registry_keeps_ballots_and_votes() -> io::Result<()> {
    let dir = tempdir()?;
    let config = StorageConfig {
        dir: dir.path().to_path_buf(),
        fsync_on_write: false,
    };
    let clock = Arc::new(ManualClock::new(1_000));
    let options = vec!["red".to_string(), "green".to_string(), "blue".to_string()];

    {
        let mut registry = BallotRegistry::open(config.clone(), clock.clone()).unwrap();
        let index = registry
            .create_ballot("Favourite colour?", options.clone(), 1_060, 300)
            .unwrap();
        clock.advance(61);
        registry.cast(index, "alice", 2).unwrap();
        registry.cast(index, "bob", 0).unwrap();
        assert!(registry.cast(index, "alice", 1).is_err());
    }

    {
        let mut registry = BallotRegistry::open(config.clone(), clock.clone()).unwrap();
        assert_eq!(registry.ballot_count(), 1);
        assert_eq!(registry.results(0).unwrap(), vec![1, 0, 1]);
        assert!(registry.has_voted(0, "alice").unwrap());

        // Duplicate protection survives the restart
        assert!(matches!(
            registry.cast(0, "alice", 0),
            Err(BallotError::DuplicateVote { .. })
        ));
        registry.cast(0, "carol", 2).unwrap();

        // New ballots continue the index sequence
        let next = registry
            .create_ballot("Again?", options.clone(), clock.now() + 10, 10)
            .unwrap();
        assert_eq!(next, 1);
    }

    clock.advance(10_000);
    let registry = BallotRegistry::open(config, clock.clone()).unwrap();
    assert_eq!(registry.ballot_count(), 2);
    assert_eq!(registry.results(0).unwrap(), vec![1, 0, 2]);
    assert_eq!(registry.winners(0).unwrap(), vec![false, false, true]);
    assert_eq!(registry.phase(0).unwrap(), Phase::Closed);
    assert_eq!(
        registry.get_ballot_by_index(1).unwrap().question,
        "Again?".to_string()
    );

    Ok(())
}

#[test]
fn shared_registry_over_journal() -> io::Result<()> {
    let dir = tempdir()?;
    let config = StorageConfig {
        dir: dir.path().to_path_buf(),
        fsync_on_write: true,
    };
    let clock = Arc::new(ManualClock::new(5_000));
    let sink = Arc::new(RecordingSink::new());

    {
        let registry = BallotRegistry::open(config.clone(), clock.clone())
            .unwrap()
            .with_event_sink(sink.clone());
        let shared = SharedRegistry::new(registry);
        let index = shared
            .create_ballot("Ship it?", vec!["yes".to_string(), "no".to_string()], 5_001, 5)
            .unwrap();
        clock.advance(1);
        shared.cast(index, "alice", 0).unwrap();
    }
    assert_eq!(sink.len(), 2);

    let registry = BallotRegistry::open(config, clock.clone()).unwrap();
    assert_eq!(registry.results(0).unwrap(), vec![1, 0]);
    Ok(())
}

#[test]
fn damaged_journal_refuses_to_open() -> io::Result<()> {
    let dir = tempdir()?;
    let config = StorageConfig {
        dir: dir.path().to_path_buf(),
        fsync_on_write: false,
    };
    let clock = Arc::new(ManualClock::new(1_000));

    {
        let mut registry = BallotRegistry::open(config.clone(), clock.clone()).unwrap();
        let index = registry
            .create_ballot("Lunch?", vec!["soup".to_string(), "salad".to_string()], 1_001, 100)
            .unwrap();
        clock.advance(1);
        registry.cast(index, "alice", 0).unwrap();
        registry.cast(index, "bob", 1).unwrap();
    }

    // Alice's vote sits between two intact entries
    let wal_path = dir.path().join("wal.log");
    let text = std::fs::read_to_string(&wal_path)?;
    std::fs::write(&wal_path, text.replacen("\"alice\"", "alice\"", 1))?;

    let result = BallotRegistry::open(config, clock.clone());
    assert!(matches!(result, Err(BallotError::Corrupt(_))));
    Ok(())
}
