//! Configuration for the HTTP client and the log viewer.

use std::time::Duration;

/// Maximum number of entries retained by a viewer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 2000;

/// Period between silent polls while auto-refresh is on.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Distance from the bottom, in scroll units, that still counts as pinned.
pub const DEFAULT_FOLLOW_THRESHOLD: usize = 10;

/// Timeout applied to every log request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`HttpLogClient`](crate::client::HttpLogClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Base URL of the management API, e.g. `http://localhost:3000/`.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Session cookie sent with every request.
    pub session_cookie: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_cookie: None,
        }
    }
}

impl HttpClientConfig {
    /// Create a configuration for the given API base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the session cookie.
    #[must_use]
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }
}

/// Configuration for [`LogViewer`](crate::viewer::LogViewer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Silent poll period.
    pub poll_interval: Duration,
    /// Buffer cap.
    pub buffer_capacity: usize,
    /// Follow-mode pin threshold.
    pub follow_threshold: usize,
    /// Whether auto-refresh starts enabled.
    pub auto_refresh: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            follow_threshold: DEFAULT_FOLLOW_THRESHOLD,
            auto_refresh: true,
        }
    }
}

impl ViewerConfig {
    /// Set the silent poll period.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the buffer cap.
    #[must_use]
    pub const fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the follow-mode threshold.
    #[must_use]
    pub const fn with_follow_threshold(mut self, threshold: usize) -> Self {
        self.follow_threshold = threshold;
        self
    }

    /// Set whether auto-refresh starts enabled.
    #[must_use]
    pub const fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }
}
