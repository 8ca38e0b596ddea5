//! Command-line argument parsing with clap.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use stack_logs::{
    DEFAULT_POLL_INTERVAL, DEFAULT_TAIL, HttpClientConfig, LevelFilter, LogQuery, TAIL_PRESETS, TargetSelector,
    ViewerConfig,
};

/// Smallest accepted `--interval-ms`.
const MIN_INTERVAL_MS: u64 = 100;

/// Tail the logs of a Stackdeck stack, service or container.
#[derive(Parser, Debug, Clone)]
#[command(name = "stacklogs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the management API.
    #[arg(long, env = "STACKLOGS_API_URL", default_value = "http://localhost:3000/")]
    pub api_url: String,

    /// Server the stack runs on.
    #[arg(long, env = "STACKLOGS_SERVER")]
    pub server: String,

    /// Stack name.
    #[arg(long, env = "STACKLOGS_STACK")]
    pub stack: String,

    /// Tail one service of the stack.
    #[arg(long)]
    pub service: Option<String>,

    /// Tail one container of the stack. Takes precedence over --service.
    #[arg(long)]
    pub container: Option<String>,

    /// Number of lines requested per fetch.
    #[arg(long, default_value_t = DEFAULT_TAIL, value_parser = parse_tail)]
    pub tail: u32,

    /// Only show lines newer than this relative time (5m, 1h, 24h).
    #[arg(long, default_value = "")]
    pub since: String,

    /// Ask the server not to prefix lines with timestamps.
    #[arg(long)]
    pub no_timestamps: bool,

    /// Print the current tail and exit instead of polling.
    #[arg(long)]
    pub no_follow: bool,

    /// Only show lines whose message contains this text (case-insensitive).
    #[arg(long, default_value = "")]
    pub grep: String,

    /// Only show lines of this level (all, error, warn, info, debug).
    #[arg(long, default_value = "all")]
    pub level: LevelFilter,

    /// Poll period in milliseconds (at least 100).
    #[arg(
        long,
        env = "STACKLOGS_INTERVAL_MS",
        default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(MIN_INTERVAL_MS..)
    )]
    pub interval_ms: u64,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Session cookie sent with every request.
    #[arg(long, env = "STACKLOGS_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Print per-level counts of the retained lines on exit.
    #[arg(long)]
    pub stats: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// One formatted line per entry.
    #[default]
    Text,
    /// One JSON object per entry.
    Json,
}

fn parse_tail(raw: &str) -> Result<u32, String> {
    let tail: u32 = raw.parse().map_err(|e| format!("{e}"))?;
    if TAIL_PRESETS.contains(&tail) {
        Ok(tail)
    } else {
        Err(format!("tail must be one of {TAIL_PRESETS:?}"))
    }
}

impl Cli {
    /// What to tail.
    ///
    /// # Errors
    ///
    /// Returns an error if the server or stack is empty.
    pub fn selector(&self) -> stack_logs::Result<TargetSelector> {
        TargetSelector::from_parts(
            self.server.as_str(),
            self.stack.as_str(),
            self.service.as_deref(),
            self.container.as_deref(),
        )
    }

    /// Query sent with every fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if `--since` is not a relative-time token.
    pub fn query(&self) -> stack_logs::Result<LogQuery> {
        LogQuery::new(self.tail, self.since.as_str(), !self.no_timestamps)
    }

    /// HTTP client settings.
    #[must_use]
    pub fn client_config(&self) -> HttpClientConfig {
        let config = HttpClientConfig::new(self.api_url.as_str())
            .with_request_timeout(Duration::from_secs(self.timeout_secs));
        match &self.cookie {
            Some(cookie) => config.with_session_cookie(cookie.as_str()),
            None => config,
        }
    }

    /// Viewer settings; polling is off with `--no-follow`.
    #[must_use]
    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig::default()
            .with_poll_interval(Duration::from_millis(self.interval_ms))
            .with_auto_refresh(!self.no_follow)
    }
}
