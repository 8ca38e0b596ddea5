//! Core types for the log tailing client.
//!
//! This module provides:
//! - [`LogLevel`] - Severity classes reported by the logs API
//! - [`LogEntry`] - One line of log output as returned by the server
//! - [`LevelFilter`] - Level predicate used by the filter engine
//! - [`LogQuery`] - Parameters of one tail request
//! - [`TargetSelector`] - What is being tailed (container, service or stack)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LogError, Result};

/// Tail sizes offered by the viewer.
pub const TAIL_PRESETS: [u32; 4] = [50, 100, 500, 1000];

/// Tail size used when nothing else is configured.
pub const DEFAULT_TAIL: u32 = 100;

/// Relative-time presets offered by the viewer (`""` means no lower bound).
pub const SINCE_PRESETS: [&str; 4] = ["", "5m", "1h", "24h"];

/// Log severity classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debugging information
    Debug = 0,
    /// General information
    Info = 1,
    /// Warning conditions
    Warn = 2,
    /// Error conditions
    Error = 3,
}

impl LogLevel {
    /// All levels, least severe first.
    pub const ALL: [Self; 4] = [Self::Debug, Self::Info, Self::Warn, Self::Error];

    /// Returns the string representation of this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Maps a level name, including common aliases, onto a level class.
    ///
    /// Matching is case-insensitive. Returns `None` for unknown names.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" | "critical" | "crit" | "panic" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" | "notice" => Some(Self::Info),
            "debug" | "trace" => Some(Self::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_lenient(s).ok_or_else(|| LogError::InvalidQuery(format!("unknown log level: {s}")))
    }
}

/// One line of log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601 timestamp as sent by the server; ordering and dedup key.
    #[serde(default)]
    pub timestamp: String,
    /// Severity class, if the server classified the line.
    #[serde(
        default,
        deserialize_with = "deserialize_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<LogLevel>,
    /// Emitting container or service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Raw text payload.
    #[serde(default)]
    pub message: String,
}

fn deserialize_level<'de, D>(deserializer: D) -> std::result::Result<Option<LogLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(LogLevel::parse_lenient))
}

impl LogEntry {
    /// Creates an unclassified entry.
    #[must_use]
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            level: None,
            source: None,
            message: message.into(),
        }
    }

    /// Sets the severity class.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the emitting source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Parses the entry's timestamp, if it is a recognizable date.
    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Parses an ISO-8601 timestamp.
///
/// RFC 3339 is tried first; offset-less forms are read as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Level predicate applied by the filter engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LevelFilter {
    /// Every entry passes.
    #[default]
    All,
    /// Only entries with exactly this level pass.
    Only(LogLevel),
}

impl LevelFilter {
    /// Returns true if an entry with the given level passes.
    #[must_use]
    pub fn matches(&self, level: Option<LogLevel>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => level == Some(*wanted),
        }
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(level) => level.fmt(f),
        }
    }
}

impl FromStr for LevelFilter {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

/// Parameters of one tail request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogQuery {
    tail: u32,
    since: String,
    timestamps: bool,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            tail: DEFAULT_TAIL,
            since: String::new(),
            timestamps: true,
        }
    }
}

impl LogQuery {
    /// Creates a validated query.
    ///
    /// # Errors
    ///
    /// Returns an error if `tail` is zero or `since` is not a relative-time
    /// token such as `5m`, `1h` or `24h`.
    pub fn new(tail: u32, since: impl Into<String>, timestamps: bool) -> Result<Self> {
        Self::default()
            .with_tail(tail)?
            .with_since(since)
            .map(|query| query.with_timestamps(timestamps))
    }

    /// Replaces the tail size.
    ///
    /// # Errors
    ///
    /// Returns an error if `tail` is zero.
    pub fn with_tail(mut self, tail: u32) -> Result<Self> {
        if tail == 0 {
            return Err(LogError::InvalidQuery("tail must be positive".to_string()));
        }
        self.tail = tail;
        Ok(self)
    }

    /// Replaces the lower time bound. An empty token removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not `<digits><s|m|h|d>`.
    pub fn with_since(mut self, since: impl Into<String>) -> Result<Self> {
        let since = since.into().trim().to_string();
        if !since.is_empty() && !is_relative_token(&since) {
            return Err(LogError::InvalidQuery(format!(
                "since must look like 5m, 1h or 24h, got {since:?}"
            )));
        }
        self.since = since;
        Ok(self)
    }

    /// Sets whether the server should embed timestamps.
    #[must_use]
    pub const fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Maximum number of lines requested.
    #[must_use]
    pub const fn tail(&self) -> u32 {
        self.tail
    }

    /// Relative lower bound, or `None` when unbounded.
    #[must_use]
    pub fn since(&self) -> Option<&str> {
        (!self.since.is_empty()).then_some(self.since.as_str())
    }

    /// Whether server timestamps are requested.
    #[must_use]
    pub const fn timestamps(&self) -> bool {
        self.timestamps
    }

    /// Query-string pairs in request order.
    ///
    /// `tail` and `since` are omitted when unset; `timestamps` is always
    /// sent, as `true` or `false`.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if self.tail > 0 {
            pairs.push(("tail", self.tail.to_string()));
        }
        if let Some(since) = self.since() {
            pairs.push(("since", since.to_string()));
        }
        pairs.push(("timestamps", self.timestamps.to_string()));
        pairs
    }
}

fn is_relative_token(token: &str) -> bool {
    let Some(unit) = token.chars().last() else {
        return false;
    };
    let digits = &token[..token.len() - unit.len_utf8()];
    matches!(unit, 's' | 'm' | 'h' | 'd')
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// The unit inside a stack whose logs are tailed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Target {
    /// Every service of the stack.
    Stack,
    /// One service of the stack.
    Service(String),
    /// One container of the stack.
    Container(String),
}

/// Identifies what to tail. Exactly one target is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSelector {
    server_id: String,
    stack: String,
    target: Target,
}

impl TargetSelector {
    /// Selects the whole stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the server id or stack name is empty.
    pub fn stack(server_id: impl Into<String>, stack: impl Into<String>) -> Result<Self> {
        let server_id = server_id.into();
        let stack = stack.into();
        if server_id.trim().is_empty() {
            return Err(LogError::InvalidSelector("server id is empty".to_string()));
        }
        if stack.trim().is_empty() {
            return Err(LogError::InvalidSelector("stack name is empty".to_string()));
        }
        Ok(Self {
            server_id,
            stack,
            target: Target::Stack,
        })
    }

    /// Builds a selector from optional service and container names.
    ///
    /// A container wins over a service; empty names count as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the server id or stack name is empty.
    pub fn from_parts(
        server_id: impl Into<String>,
        stack: impl Into<String>,
        service: Option<&str>,
        container: Option<&str>,
    ) -> Result<Self> {
        let present = |name: Option<&str>| name.filter(|n| !n.trim().is_empty()).map(str::to_string);
        let mut selector = Self::stack(server_id, stack)?;
        selector.target = match (present(container), present(service)) {
            (Some(container), _) => Target::Container(container),
            (None, Some(service)) => Target::Service(service),
            (None, None) => Target::Stack,
        };
        Ok(selector)
    }

    /// Narrows the selector to one service of the same stack.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.target = Target::Service(service.into());
        self
    }

    /// Narrows the selector to one container of the same stack.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.target = Target::Container(container.into());
        self
    }

    /// Server the stack runs on.
    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Stack name.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack
    }

    /// Active target.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server_id, self.stack)?;
        match &self.target {
            Target::Stack => Ok(()),
            Target::Service(name) => write!(f, " service {name}"),
            Target::Container(name) => write!(f, " container {name}"),
        }
    }
}
