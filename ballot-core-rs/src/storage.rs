//! Persistent journal for the ballot registry.
//!
//! Implements:
//! - Write-ahead log (WAL) of committed mutations, one JSON object per line
//! - Crash recovery by replaying the WAL
//!
//! The registry validates a mutation, appends it here, and only then
//! applies it in memory, so a failed write never leaves a half-applied
//! change behind.

use crate::types::{BallotIndex, OptionIndex, Timestamp, VoterId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const WAL_FILE: &str = "wal.log";

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for storage files
    pub dir: PathBuf,
    /// Flush to disk after every write
    pub fsync_on_write: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./ballot-data"),
            fsync_on_write: true,
        }
    }
}

/// WAL entry for recovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WalEntry {
    /// Ballot appended to the registry
    #[serde(rename = "BALLOT_CREATED")]
    BallotCreated {
        index: BallotIndex,
        question: String,
        options: Vec<String>,
        start_time: Timestamp,
        duration: u64,
    },

    /// Vote recorded
    #[serde(rename = "VOTE_CAST")]
    VoteCast {
        index: BallotIndex,
        voter: VoterId,
        option: OptionIndex,
    },
}

/// Append-only sink for committed mutations
pub trait Journal: Send + Sync {
    fn append(&mut self, entry: &WalEntry) -> io::Result<()>;
}

/// Recovered state from storage
#[derive(Debug, Default)]
pub struct RecoveredState {
    /// Entries in commit order
    pub entries: Vec<WalEntry>,
}

/// File-backed WAL
pub struct Storage {
    config: StorageConfig,
    /// Current WAL file, opened for appending
    wal_file: Option<File>,
    /// Length of the committed prefix of the WAL
    wal_size: u64,
    /// Entries appended since open
    entries_written: usize,
}

impl Storage {
    /// Create new storage instance
    pub fn new(config: StorageConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.dir)?;

        Ok(Self {
            config,
            wal_file: None,
            wal_size: 0,
            entries_written: 0,
        })
    }

    /// Open storage and recover state
    pub fn open(&mut self) -> io::Result<RecoveredState> {
        let (state, valid_len) = self.recover()?;
        self.open_wal(valid_len)?;
        Ok(state)
    }

    fn wal_path(&self) -> PathBuf {
        self.config.dir.join(WAL_FILE)
    }

    /// Open WAL file for appending, cutting off anything past `valid_len`
    fn open_wal(&mut self, valid_len: u64) -> io::Result<()> {
        let wal_path = self.wal_path();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)?;

        let len = file.metadata()?.len();
        if len > valid_len {
            warn!(
                "Storage: Truncating torn WAL tail ({} bytes)",
                len - valid_len
            );
            file.set_len(valid_len)?;
        }
        self.wal_size = valid_len;

        // Last entry complete but missing its newline
        if self.wal_size > 0 && !ends_with_newline(&wal_path)? {
            file.write_all(b"\n")?;
            self.wal_size += 1;
        }
        file.sync_data()?;
        self.wal_file = Some(file);

        debug!("Storage: Opened WAL at {:?} (size={})", wal_path, self.wal_size);
        Ok(())
    }

    /// Replay the WAL.
    ///
    /// Only the final line may fail to parse (a write torn by a crash); it
    /// is dropped. A bad line followed by more data is `InvalidData`.
    /// Also returns the length of the valid prefix.
    fn recover(&self) -> io::Result<(RecoveredState, u64)> {
        let mut state = RecoveredState::default();

        let wal_path = self.wal_path();
        if !wal_path.exists() {
            return Ok((state, 0));
        }

        let mut reader = BufReader::new(File::open(&wal_path)?);
        let mut lines = Vec::new();
        loop {
            let mut line = Vec::new();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            lines.push(line);
        }

        let last = lines.iter().rposition(|line| !is_blank(line));
        let mut valid_len = 0u64;

        for (i, line) in lines.iter().enumerate() {
            let line_num = i + 1;
            if !is_blank(line) {
                match serde_json::from_slice::<WalEntry>(line) {
                    Ok(entry) => state.entries.push(entry),
                    Err(e) if Some(i) == last => {
                        warn!("Storage: Dropping torn WAL line {}: {}", line_num, e);
                        break;
                    }
                    Err(e) => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("WAL line {}: {}", line_num, e),
                        ));
                    }
                }
            }
            valid_len += line.len() as u64;
        }

        info!(
            "Storage: Replayed {} WAL lines, {} entries recovered",
            lines.len(),
            state.entries.len()
        );
        Ok((state, valid_len))
    }

    /// Write entry to WAL. On failure the file is cut back to its last
    /// committed length, so a rejected entry never becomes durable.
    fn write_wal(&mut self, entry: &WalEntry) -> io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let wal = self
            .wal_file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "WAL not open"))?;

        let mut written = wal.write_all(line.as_bytes());
        if written.is_ok() && self.config.fsync_on_write {
            written = wal.sync_data();
        }

        if let Err(e) = written {
            if let Err(rollback) = self.rollback() {
                warn!("Storage: WAL rollback failed, closing journal: {}", rollback);
            }
            return Err(e);
        }

        self.wal_size += line.len() as u64;
        self.entries_written += 1;

        Ok(())
    }

    /// Discard whatever a failed write left past `wal_size` and reopen the
    /// WAL. Leaves the WAL closed if that is not possible.
    fn rollback(&mut self) -> io::Result<()> {
        self.wal_file = None;
        let wal_path = self.wal_path();

        let file = OpenOptions::new().write(true).open(&wal_path)?;
        file.set_len(self.wal_size)?;
        file.sync_data()?;

        self.wal_file = Some(OpenOptions::new().append(true).open(&wal_path)?);
        debug!("Storage: Rolled WAL back to {} bytes", self.wal_size);
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            wal_size: self.wal_size,
            entries_written: self.entries_written,
        }
    }
}

impl Journal for Storage {
    fn append(&mut self, entry: &WalEntry) -> io::Result<()> {
        self.write_wal(entry)
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn ends_with_newline(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub wal_size: u64,
    pub entries_written: usize,
}

/// In-memory journal for testing.
///
/// Clones share the same entry list, so a test can hand one clone to a
/// registry and inspect the other.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<Vec<WalEntry>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<WalEntry> {
        self.entries.lock().clone()
    }

    pub fn recover(&self) -> RecoveredState {
        RecoveredState {
            entries: self.entries(),
        }
    }
}

impl Journal for MemoryStorage {
    fn append(&mut self, entry: &WalEntry) -> io::Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}
