//! Command history for pipesh
//!
//! A bounded list of past lines. Every recorded line gets the next index,
//! starting at 1, and keeps it for as long as it is retained. When the store
//! is full the oldest line is dropped and its index is never handed out
//! again, so `!N` either finds the line that was numbered N or nothing.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub index: usize,
    pub line: String,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
    next_index: usize,
}

/// Whether a line belongs in history at all
fn is_recordable(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('!') && trimmed != "history"
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryStore {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            next_index: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a line, returning the index it was given.
    ///
    /// Blank lines, replay requests and the `history` listing itself are
    /// skipped and return `None`.
    pub fn record(&mut self, line: &str) -> Option<usize> {
        if !is_recordable(line) {
            return None;
        }
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!("history full, dropping entry {}", evicted.index);
            }
        }

        let index = self.next_index;
        self.next_index += 1;
        self.entries.push_back(HistoryEntry {
            index,
            line: line.trim().to_string(),
        });
        Some(index)
    }

    /// Look up the line recorded under `index`
    pub fn by_index(&self, index: usize) -> Option<&str> {
        let oldest = self.entries.front()?.index;
        let offset = index.checked_sub(oldest)?;
        self.entries.get(offset).map(|e| e.line.as_str())
    }

    /// The most recent line starting with `prefix`
    pub fn by_prefix(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.line.starts_with(prefix))
            .map(|e| e.line.as_str())
    }

    /// Retained entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Record every line of a saved history file.
    /// A missing file is not an error.
    pub fn load(&mut self, path: &Path) -> io::Result<usize> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let loaded = contents
            .lines()
            .filter_map(|line| self.record(line))
            .count();
        log::debug!("loaded {} history entries from {}", loaded, path.display());
        Ok(loaded)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = io::BufWriter::new(fs::File::create(path)?);
        for entry in &self.entries {
            writeln!(file, "{}", entry.line)?;
        }
        file.flush()
    }
}
