//! Collapsing bursts of file events
//!
//! Editors often write a file several times in quick succession (save,
//! format-on-save, swap files). Each path is held until it has been quiet for
//! the debounce window, then released once. Time is passed in explicitly so
//! the dispatch loop owns the clock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Record an event for `path` at `now`, pushing its release back.
    pub fn push(&mut self, path: impl Into<PathBuf>, now: Instant) {
        self.pending.insert(path.into(), now + self.window);
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest moment a pending path becomes ready
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every path that has been quiet for the full window,
    /// sorted for deterministic processing.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            self.pending.remove(path);
        }
        ready.sort();
        ready
    }
}
