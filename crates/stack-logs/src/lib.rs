//! # stack-logs
//!
//! Live log tailing for Stackdeck stacks, services and containers.
//!
//! The management API exposes a "tail" endpoint per target. This crate
//! polls it, deduplicates overlapping batches and keeps a bounded,
//! filterable view that can follow the newest entry.
//!
//! This crate provides:
//!
//! - [`TargetSelector`] and [`resolve`] - what to tail and where it lives
//! - [`LogSource`] / [`HttpLogClient`] - one fetch per call
//! - [`LogBuffer`] - insertion-ordered entries capped at 2000
//! - [`apply_batch`] and [`Watermark`] - timestamp based merge/dedup
//! - [`PollScheduler`] - repeating silent fetches
//! - [`ViewFilter`] and [`LogStats`] - search, level filter and counts
//! - [`FollowController`] - auto-scroll to the newest entry
//! - [`LogViewer`] - the session tying everything together
//!
//! ## Example
//!
//! ```rust
//! use stack_logs::{FetchMode, LevelFilter, LogBuffer, LogEntry, LogLevel, Watermark, apply_batch, filter};
//!
//! let mut buffer = LogBuffer::default();
//! let mut watermark = Watermark::unknown();
//! let first = vec![
//!     LogEntry::new("2024-05-01T10:00:01Z", "starting").with_level(LogLevel::Info),
//!     LogEntry::new("2024-05-01T10:00:02Z", "db refused").with_level(LogLevel::Error),
//! ];
//! apply_batch(&mut buffer, first, &mut watermark, FetchMode::Blocking);
//!
//! // An overlapping poll only adds what is new.
//! let next = vec![
//!     LogEntry::new("2024-05-01T10:00:02Z", "db refused").with_level(LogLevel::Error),
//!     LogEntry::new("2024-05-01T10:00:03Z", "db ok").with_level(LogLevel::Info),
//! ];
//! let outcome = apply_batch(&mut buffer, next, &mut watermark, FetchMode::Silent);
//! assert_eq!(outcome.appended, 1);
//! assert_eq!(buffer.len(), 3);
//!
//! let errors = filter(&buffer, "", LevelFilter::Only(LogLevel::Error));
//! assert_eq!(errors.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod follow;
pub mod merge;
pub mod render;
pub mod scheduler;
pub mod types;
pub mod viewer;

// Re-export main types
pub use buffer::LogBuffer;
pub use client::{FetchFuture, FetchMode, HttpLogClient, LogSource, error_from_response, parse_logs_body};
pub use config::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_FOLLOW_THRESHOLD, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT,
    HttpClientConfig, ViewerConfig,
};
pub use endpoint::{ResourcePath, resolve};
pub use error::{FetchError, LogError, Result};
pub use filter::{LogStats, ViewFilter, filter};
pub use follow::FollowController;
pub use merge::{MergeOutcome, Watermark, apply_batch, merge, replace};
pub use render::format_entry;
pub use scheduler::{
    MIN_POLL_INTERVAL, POLL_CHANNEL_CAPACITY, PollEvent, PollJob, PollScheduler, SchedulerState, poll_channel,
};
pub use types::{
    DEFAULT_TAIL, LevelFilter, LogEntry, LogLevel, LogQuery, SINCE_PRESETS, TAIL_PRESETS, Target, TargetSelector,
    parse_timestamp,
};
pub use viewer::{LogViewer, SessionState};
