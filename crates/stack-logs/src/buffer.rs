//! Bounded, insertion-ordered buffer of retained log entries.

use std::collections::VecDeque;
use std::collections::vec_deque;

use crate::config::DEFAULT_BUFFER_CAPACITY;
use crate::types::LogEntry;

/// Ordered log entries capped at a fixed size; the oldest are evicted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl LogBuffer {
    /// Creates an empty buffer. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_BUFFER_CAPACITY)),
            capacity,
        }
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    /// Newest entry.
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    /// The newest `n` entries, oldest first.
    pub fn newest(&self, n: usize) -> vec_deque::Iter<'_, LogEntry> {
        self.entries.range(self.entries.len().saturating_sub(n)..)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the contents with a batch, keeping only its newest entries.
    ///
    /// Returns how many entries of the batch did not fit.
    pub(crate) fn replace(&mut self, batch: Vec<LogEntry>) -> usize {
        self.entries.clear();
        self.extend(batch)
    }

    /// Appends entries in order, then evicts from the front down to the cap.
    ///
    /// Returns the number of evicted entries.
    pub(crate) fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) -> usize {
        self.entries.extend(entries);
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }
}

impl<'a> IntoIterator for &'a LogBuffer {
    type Item = &'a LogEntry;
    type IntoIter = vec_deque::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
