//! CLI error types.

use stack_logs::LogError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid flag combination or value.
    #[error("configuration error: {0}")]
    Config(String),
    /// Rejected by the log client.
    #[error(transparent)]
    Log(#[from] LogError),
    /// The initial load failed.
    #[error("failed to load logs: {0}")]
    Fetch(String),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
