//! Error types for the log tailing client.

use thiserror::Error;

/// Failure of a single log fetch.
///
/// This is the only error kind surfaced while tailing. Its `Display` output
/// is the human-readable message shown in the viewer's error banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message from the JSON error body, or the status line.
        message: String,
    },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// A 2xx response whose body was not a valid log payload.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Returns the HTTP status code, if the server produced one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Errors raised while configuring a log session.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log query has an invalid field.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The target selector is incomplete.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Client configuration could not be applied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result type alias for log session operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_message_only() {
        let err = FetchError::Http {
            status: 404,
            message: "stack not found".to_string(),
        };
        assert_eq!(err.to_string(), "stack not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn other_fetch_errors_have_no_status() {
        assert_eq!(FetchError::Timeout.status(), None);
        assert_eq!(FetchError::Network("refused".into()).status(), None);
        assert_eq!(
            FetchError::Decode("eof".into()).to_string(),
            "invalid response body: eof"
        );
    }

    #[test]
    fn log_error_display_messages() {
        let err = LogError::InvalidQuery("tail must be positive".to_string());
        assert_eq!(err.to_string(), "invalid query: tail must be positive");

        let err = LogError::InvalidSelector("server id is empty".to_string());
        assert_eq!(err.to_string(), "invalid selector: server id is empty");
    }

    #[test]
    fn fetch_error_is_transparent_inside_log_error() {
        let err: LogError = FetchError::Timeout.into();
        assert_eq!(err.to_string(), "request timed out");
        assert!(matches!(err, LogError::Fetch(FetchError::Timeout)));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FetchError>();
        assert_send_sync::<LogError>();
    }
}
