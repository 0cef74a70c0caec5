//! Durable monotonically increasing patient counter.
//!
//! The counter lives in a single small JSON file (`{"counter": N}`) and is
//! read once at startup. Every successful [`PersistentCounter::next`] rewrites
//! the file through a temp-file-and-rename sequence and fsyncs before the new
//! value is handed out, so the value on disk is always at least as large as
//! any value a caller has ever seen. A persist failure rolls the in-memory
//! value back and no identifier is issued.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, RelayError};

#[derive(Debug, Serialize, Deserialize)]
struct CounterFile {
    counter: u64,
}

/// File-backed process-wide counter.
///
/// Not internally synchronized: callers (the record ledger) serialize access
/// through their own critical section, which is also what guarantees that no
/// two save operations observe the same post-increment value.
#[derive(Debug)]
pub struct PersistentCounter {
    path: PathBuf,
    value: u64,
}

impl PersistentCounter {
    /// Load the counter from `path`. A missing or unreadable file starts the
    /// counter at 0; a fresh deployment and a corrupt file look the same, and
    /// the row ledger remains the canonical record either way.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let value = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<CounterFile>(&raw).ok())
            .map(|file| file.counter)
            .unwrap_or(0);
        Self { path, value }
    }

    /// Highest value issued so far (0 if none).
    pub fn current(&self) -> u64 {
        self.value
    }

    /// Increment, persist, and only then return the new value.
    ///
    /// The persist step completes before the increment is considered
    /// committed: on failure the in-memory value rolls back and the error is
    /// surfaced as a storage error, so no identifier exists that stable
    /// storage has never recorded.
    pub fn next(&mut self) -> AppResult<u64> {
        let next = self.value + 1;
        self.persist(next)?;
        self.value = next;
        Ok(next)
    }

    fn persist(&self, value: u64) -> AppResult<()> {
        let body = serde_json::to_vec(&CounterFile { counter: value })
            .map_err(|e| RelayError::Storage(format!("counter encode: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)
            .map_err(|e| RelayError::Storage(format!("counter temp create: {e}")))?;
        file.write_all(&body)
            .and_then(|()| file.sync_all())
            .map_err(|e| RelayError::Storage(format!("counter write: {e}")))?;
        drop(file);
        fs::rename(&tmp, &self.path)
            .map_err(|e| RelayError::Storage(format!("counter rename: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn starts_at_zero_when_file_absent() {
        let dir = TempDir::new().unwrap();
        let counter = PersistentCounter::open(dir.path().join("counter.json"));
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn starts_at_zero_when_file_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.json");
        fs::write(&path, b"not json").unwrap();
        let counter = PersistentCounter::open(&path);
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn next_persists_before_returning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.json");

        let mut counter = PersistentCounter::open(&path);
        assert_eq!(counter.next().unwrap(), 1);
        assert_eq!(counter.next().unwrap(), 2);

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["counter"], 2);
    }

    #[test]
    fn value_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.json");

        let mut counter = PersistentCounter::open(&path);
        counter.next().unwrap();
        counter.next().unwrap();
        drop(counter);

        let mut reopened = PersistentCounter::open(&path);
        assert_eq!(reopened.current(), 2);
        assert_eq!(reopened.next().unwrap(), 3);
    }

    #[test]
    fn persist_failure_rolls_back() {
        let dir = TempDir::new().unwrap();
        // A missing parent directory makes every persist fail.
        let mut counter = PersistentCounter::open(dir.path().join("missing").join("counter.json"));
        let result = counter.next();
        assert!(matches!(result, Err(RelayError::Storage(_))));
        assert_eq!(counter.current(), 0);
    }
}
