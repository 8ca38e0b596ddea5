//! Filter engine: derived, read-only views over the buffer.

use serde::Serialize;

use crate::types::{LevelFilter, LogEntry, LogLevel};

/// Search term and level predicate applied to the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    search: String,
    needle: String,
    level: LevelFilter,
}

impl ViewFilter {
    /// Creates a filter from a free-text search and a level predicate.
    #[must_use]
    pub fn new(search: impl Into<String>, level: LevelFilter) -> Self {
        let search = search.into();
        let needle = search.to_lowercase();
        Self { search, needle, level }
    }

    /// Search term as entered.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Level predicate.
    #[must_use]
    pub const fn level(&self) -> LevelFilter {
        self.level
    }

    /// Returns true if no predicate can reject an entry.
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.needle.is_empty() && self.level == LevelFilter::All
    }

    /// Returns true if `entry` satisfies both predicates.
    ///
    /// The search is a case-insensitive substring match on the message.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.level.matches(entry.level)
            && (self.needle.is_empty() || entry.message.to_lowercase().contains(&self.needle))
    }

    /// Lazily yields the matching entries, preserving order.
    pub fn apply<'s, 'a: 's, I>(&'s self, entries: I) -> impl Iterator<Item = &'a LogEntry> + Clone + 's
    where
        I: IntoIterator<Item = &'a LogEntry>,
        I::IntoIter: Clone + 's,
    {
        entries.into_iter().filter(move |entry| self.matches(entry))
    }
}

/// Filters `entries` by message search and level.
///
/// `filter(buffer, "", LevelFilter::All)` yields the whole buffer in order.
pub fn filter<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    search: &str,
    level: LevelFilter,
) -> Vec<&'a LogEntry> {
    let view = ViewFilter::new(search, level);
    entries.into_iter().filter(|entry| view.matches(entry)).collect()
}

/// Per-level counts over the unfiltered buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    /// Number of entries.
    pub total: usize,
    /// Error entries.
    pub error: usize,
    /// Warning entries.
    pub warn: usize,
    /// Info entries.
    pub info: usize,
    /// Debug entries, including unclassified ones.
    pub debug: usize,
}

impl LogStats {
    /// Counts entries per level; unclassified entries land in `debug`.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut stats, entry| {
            stats.total += 1;
            match entry.level {
                Some(LogLevel::Error) => stats.error += 1,
                Some(LogLevel::Warn) => stats.warn += 1,
                Some(LogLevel::Info) => stats.info += 1,
                Some(LogLevel::Debug) | None => stats.debug += 1,
            }
            stats
        })
    }

    /// Count for one level bucket.
    #[must_use]
    pub const fn count(&self, level: LogLevel) -> usize {
        match level {
            LogLevel::Error => self.error,
            LogLevel::Warn => self.warn,
            LogLevel::Info => self.info,
            LogLevel::Debug => self.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LogBuffer;

    fn sample() -> LogBuffer {
        let mut buffer = LogBuffer::new(100);
        buffer.extend(vec![
            LogEntry::new("t1", "Server started on :8080").with_level(LogLevel::Info),
            LogEntry::new("t2", "Connection REFUSED by db").with_level(LogLevel::Error),
            LogEntry::new("t3", "retrying connection").with_level(LogLevel::Warn),
            LogEntry::new("t4", "raw line without level"),
            LogEntry::new("t5", "cache miss").with_level(LogLevel::Debug),
            LogEntry::new("t6", "connection established").with_level(LogLevel::Info),
        ]);
        buffer
    }

    fn timestamps(entries: &[&LogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.timestamp.clone()).collect()
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let buffer = sample();
        let all = filter(&buffer, "", LevelFilter::All);
        assert_eq!(timestamps(&all), vec!["t1", "t2", "t3", "t4", "t5", "t6"]);
    }

    #[test]
    fn search_is_case_insensitive_on_message() {
        let buffer = sample();
        let hits = filter(&buffer, "connection", LevelFilter::All);
        assert_eq!(timestamps(&hits), vec!["t2", "t3", "t6"]);
    }

    #[test]
    fn search_ignores_source_and_timestamp() {
        let mut buffer = LogBuffer::new(10);
        buffer.extend(vec![LogEntry::new("needle-ts", "hay").with_source("needle")]);
        assert!(filter(&buffer, "needle", LevelFilter::All).is_empty());
    }

    #[test]
    fn level_filter_is_exact() {
        let buffer = sample();
        let info = filter(&buffer, "", LevelFilter::Only(LogLevel::Info));
        assert_eq!(timestamps(&info), vec!["t1", "t6"]);

        let debug = filter(&buffer, "", LevelFilter::Only(LogLevel::Debug));
        assert_eq!(timestamps(&debug), vec!["t5"]);
    }

    #[test]
    fn predicates_and_together() {
        let buffer = sample();
        let hits = filter(&buffer, "CONNECTION", LevelFilter::Only(LogLevel::Info));
        assert_eq!(timestamps(&hits), vec!["t6"]);
    }

    #[test]
    fn view_is_restartable_and_does_not_mutate() {
        let buffer = sample();
        let before = buffer.clone();
        let view = ViewFilter::new("c", LevelFilter::All);
        let iter = view.apply(&buffer);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(buffer, before);
    }

    #[test]
    fn pass_through_detection() {
        assert!(ViewFilter::default().is_pass_through());
        assert!(!ViewFilter::new("x", LevelFilter::All).is_pass_through());
        assert!(!ViewFilter::new("", LevelFilter::Only(LogLevel::Warn)).is_pass_through());
    }

    #[test]
    fn stats_count_unclassified_as_debug() {
        let stats = LogStats::from_entries(&sample());
        assert_eq!(
            stats,
            LogStats {
                total: 6,
                error: 1,
                warn: 1,
                info: 2,
                debug: 2,
            }
        );
        assert_eq!(stats.count(LogLevel::Debug), 2);
    }

    #[test]
    fn stats_of_empty_buffer() {
        assert_eq!(LogStats::from_entries(&LogBuffer::default()), LogStats::default());
    }
}
