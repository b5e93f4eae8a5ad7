//! JSONL event store - append-only writer
//!
//! Events land in `<base>/<YYYY-MM-DD>.jsonl`, keyed by the event's own
//! timestamp. The store remembers the chain head and refuses an event
//! that does not extend it.

use crate::error::EventError;
use crate::event::LendingEvent;
use crate::reader::EventReader;
use crate::sink::EventSink;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct EventStore {
    base_path: PathBuf,
    writer: Option<(String, BufWriter<File>)>,
    head: Option<(u64, String)>,
}

impl EventStore {
    /// Open (or create) a store, picking up the chain head of any existing log
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, EventError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let head = EventReader::from_directory(&base_path)?
            .last_event()?
            .map(|last| (last.sequence, last.hash));

        Ok(Self {
            base_path,
            writer: None,
            head,
        })
    }

    /// Sequence and hash of the last stored event
    pub fn head(&self) -> Option<(u64, &str)> {
        self.head.as_ref().map(|(seq, hash)| (*seq, hash.as_str()))
    }

    /// Append an event that extends the current head
    pub fn append(&mut self, event: &LendingEvent) -> Result<(), EventError> {
        if let Some((sequence, hash)) = &self.head {
            if event.sequence != sequence + 1 {
                return Err(EventError::InvalidSequence {
                    expected: sequence + 1,
                    actual: event.sequence,
                });
            }
            if &event.prev_hash != hash {
                return Err(EventError::BrokenChain {
                    sequence: event.sequence,
                    expected: hash.clone(),
                    actual: event.prev_hash.clone(),
                });
            }
        }

        let line = serde_json::to_string(event)?;
        let writer = self.writer_for(&event.timestamp.format("%Y-%m-%d").to_string())?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;

        self.head = Some((event.sequence, event.hash.clone()));
        Ok(())
    }

    fn writer_for(&mut self, date: &str) -> Result<&mut BufWriter<File>, EventError> {
        let stale = !matches!(&self.writer, Some((open, _)) if open == date);
        if stale {
            self.close()?;
            let path = self.file_path(date);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing::debug!(path = %path.display(), "Opened event file");
            self.writer = Some((date.to_string(), BufWriter::new(file)));
        }

        match &mut self.writer {
            Some((_, writer)) => Ok(writer),
            None => Err(EventError::InvalidFile(format!("no writer for {}", date))),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Log file for a UTC date (`YYYY-MM-DD`)
    pub fn file_path(&self, date: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", date))
    }

    /// Flush and release the open file
    pub fn close(&mut self) -> Result<(), EventError> {
        if let Some((_, mut writer)) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl EventSink for EventStore {
    fn publish(&mut self, event: &LendingEvent) -> Result<(), EventError> {
        self.append(event)
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::GENESIS_HASH;
    use crate::event::{EventDraft, EventKind};
    use chrono::{TimeZone, Utc};
    use colend_core::{AccountId, Amount, AssetId};
    use tempfile::TempDir;

    fn deposit(sequence: u64, prev_hash: &str, day: u32) -> LendingEvent {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap();
        EventDraft::new(EventKind::Deposit)
            .account(&AccountId::new("ALICE").unwrap())
            .leg(&AssetId::new("DAI").unwrap(), Amount::from_units(sequence * 10))
            .seal(sequence, prev_hash, timestamp)
    }

    #[test]
    fn test_rotates_by_event_date() {
        let dir = TempDir::new().unwrap();
        let mut store = EventStore::new(dir.path()).unwrap();

        let first = deposit(1, GENESIS_HASH, 1);
        let second = deposit(2, &first.hash, 2);
        store.append(&first).unwrap();
        store.append(&second).unwrap();
        store.close().unwrap();

        assert!(store.file_path("2026-03-01").exists());
        assert!(store.file_path("2026-03-02").exists());
        assert_eq!(store.head(), Some((2, second.hash.as_str())));
    }

    #[test]
    fn test_rejects_event_that_does_not_extend_head() {
        let dir = TempDir::new().unwrap();
        let mut store = EventStore::new(dir.path()).unwrap();

        let first = deposit(1, GENESIS_HASH, 1);
        store.append(&first).unwrap();

        let gap = deposit(3, &first.hash, 1);
        assert!(matches!(
            store.append(&gap),
            Err(EventError::InvalidSequence { expected: 2, actual: 3 })
        ));

        let fork = deposit(2, "not-the-head", 1);
        assert!(matches!(store.append(&fork), Err(EventError::BrokenChain { .. })));
    }

    #[test]
    fn test_reopen_resumes_head() {
        let dir = TempDir::new().unwrap();
        let first = deposit(1, GENESIS_HASH, 1);
        {
            let mut store = EventStore::new(dir.path()).unwrap();
            store.append(&first).unwrap();
        }

        let mut store = EventStore::new(dir.path()).unwrap();
        assert_eq!(store.head(), Some((1, first.hash.as_str())));
        store.append(&deposit(2, &first.hash, 1)).unwrap();
    }
}
