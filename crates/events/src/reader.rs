//! JSONL event reader - sequential reader for replay and audit

use crate::chain::verify_chain;
use crate::error::EventError;
use crate::event::LendingEvent;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Sequential event reader
pub struct EventReader {
    files: Vec<PathBuf>,
}

impl EventReader {
    /// Create a new reader from a directory
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if file_path.extension().map_or(false, |ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        // Date-named files sort chronologically
        files.sort();

        Ok(Self { files })
    }

    /// Read all events from all files in order
    pub fn read_all(&self) -> Result<Vec<LendingEvent>, EventError> {
        let mut events = Vec::new();

        for file_path in &self.files {
            let reader = BufReader::new(File::open(file_path)?);

            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let event: LendingEvent = serde_json::from_str(&line).map_err(|e| {
                    EventError::InvalidFile(format!("{}:{}: {}", file_path.display(), line_no + 1, e))
                })?;
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Read everything and verify the hash chain
    pub fn read_verified(&self) -> Result<Vec<LendingEvent>, EventError> {
        let events = self.read_all()?;
        verify_chain(&events)?;
        Ok(events)
    }

    /// Last event in the log (for resuming the chain)
    pub fn last_event(&self) -> Result<Option<LendingEvent>, EventError> {
        Ok(self.read_all()?.pop())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
