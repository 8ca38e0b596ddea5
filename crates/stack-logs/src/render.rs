//! Plain-text rendering of log entries.

use std::fmt::Write as _;

use crate::types::LogEntry;

/// Display format for parseable timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Formats one entry as `[timestamp] LEVEL source: message`.
///
/// The timestamp is shown in UTC when it parses and verbatim otherwise.
/// Missing level or source are left out; an empty timestamp drops the
/// bracketed prefix.
#[must_use]
pub fn format_entry(entry: &LogEntry) -> String {
    let mut line = String::with_capacity(entry.message.len() + 48);

    match entry.parsed_timestamp() {
        Some(ts) => {
            let _ = write!(line, "[{}] ", ts.format(TIMESTAMP_FORMAT));
        }
        None if !entry.timestamp.is_empty() => {
            let _ = write!(line, "[{}] ", entry.timestamp);
        }
        None => {}
    }
    if let Some(level) = entry.level {
        let _ = write!(line, "{:<5} ", level.as_str().to_uppercase());
    }
    if let Some(source) = entry.source.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(line, "{source}: ");
    }
    line.push_str(&entry.message);
    line
}

/// Cuts `line` down to at most `width` characters.
#[must_use]
pub fn truncate(line: &str, width: usize) -> &str {
    match line.char_indices().nth(width) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
