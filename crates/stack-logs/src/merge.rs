//! Merge/dedup engine.
//!
//! Combines a freshly fetched batch with the retained [`LogBuffer`]. Silent
//! polls on a populated buffer append only the entries newer than the
//! [`Watermark`]; every other fetch replaces the buffer wholesale.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::buffer::LogBuffer;
use crate::client::FetchMode;
use crate::types::{LogEntry, parse_timestamp};

/// Timestamp boundary separating seen entries from new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Watermark(Option<String>);

impl Watermark {
    /// No boundary known yet.
    #[must_use]
    pub const fn unknown() -> Self {
        Self(None)
    }

    /// Boundary at the given raw timestamp.
    #[must_use]
    pub fn at(timestamp: impl Into<String>) -> Self {
        Self(Some(timestamp.into()))
    }

    /// Boundary at the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self::at(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    /// Returns true once a boundary has been recorded.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.0.is_some()
    }

    /// Raw boundary timestamp.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Parsed boundary timestamp.
    #[must_use]
    pub fn parsed(&self) -> Option<DateTime<Utc>> {
        self.0.as_deref().and_then(parse_timestamp)
    }

    /// Returns true if `entry` counts as new relative to this boundary.
    ///
    /// An entry is new iff its timestamp is strictly later. If either side
    /// fails to parse, the entry is kept.
    #[must_use]
    pub fn admits(&self, entry: &LogEntry) -> bool {
        match (self.parsed(), entry.parsed_timestamp()) {
            (Some(boundary), Some(ts)) => ts > boundary,
            _ => true,
        }
    }

    /// Moves the boundary to `timestamp` unless that would move it backwards.
    fn advance_to(&mut self, timestamp: &str) {
        let keep_current = match (self.parsed(), parse_timestamp(timestamp)) {
            (Some(current), Some(next)) => next < current,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !keep_current {
            self.0 = Some(timestamp.to_string());
        }
    }
}

/// What a merge did to the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The buffer was replaced rather than appended to.
    pub replaced: bool,
    /// Entries added at the end of the buffer.
    pub appended: usize,
    /// Entries evicted from the front to respect the cap.
    pub evicted: usize,
}

impl MergeOutcome {
    /// Returns true if the buffer contents changed.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.replaced || self.appended > 0
    }
}

/// Applies a fetched batch according to how it was fetched.
///
/// Silent fetches on a non-empty buffer with a known watermark are merged;
/// everything else replaces the buffer.
pub fn apply_batch(
    buffer: &mut LogBuffer,
    incoming: Vec<LogEntry>,
    watermark: &mut Watermark,
    mode: FetchMode,
) -> MergeOutcome {
    if mode == FetchMode::Silent && !buffer.is_empty() && watermark.is_known() {
        merge(buffer, incoming, watermark)
    } else {
        replace(buffer, incoming, watermark, mode)
    }
}

/// Appends the entries of `incoming` that are newer than `watermark`.
///
/// If nothing is new the buffer is not touched. The watermark follows the
/// last incoming entry.
pub fn merge(buffer: &mut LogBuffer, incoming: Vec<LogEntry>, watermark: &mut Watermark) -> MergeOutcome {
    let Some(last) = incoming.last().map(|e| e.timestamp.clone()) else {
        return MergeOutcome::default();
    };

    let fresh: Vec<LogEntry> = incoming.into_iter().filter(|e| watermark.admits(e)).collect();
    watermark.advance_to(&last);

    if fresh.is_empty() {
        return MergeOutcome::default();
    }
    let appended = fresh.len();
    let evicted = buffer.extend(fresh);
    MergeOutcome {
        replaced: false,
        appended,
        evicted,
    }
}

/// Replaces the buffer with `incoming` and resets the watermark from it.
///
/// A blocking fetch that returns nothing pins the watermark to "now" so the
/// next silent poll only looks for genuinely new lines.
pub fn replace(
    buffer: &mut LogBuffer,
    incoming: Vec<LogEntry>,
    watermark: &mut Watermark,
    mode: FetchMode,
) -> MergeOutcome {
    match incoming.last() {
        Some(last) => *watermark = Watermark::at(last.timestamp.clone()),
        None if mode == FetchMode::Blocking => *watermark = Watermark::now(),
        None => {}
    }
    let appended = incoming.len();
    let evicted = buffer.replace(incoming);
    MergeOutcome {
        replaced: true,
        appended: appended - evicted,
        evicted,
    }
}
