//! Log fetch client.
//!
//! [`LogSource`] is the seam between the viewer and the logs API. The
//! production implementation, [`HttpLogClient`], issues one `GET` per call
//! against a resolved [`ResourcePath`] and parses the `{ "logs": [...] }`
//! payload.
//!
//! # Example
//!
//! ```rust,no_run
//! use stack_logs::{FetchMode, HttpClientConfig, HttpLogClient, LogQuery, LogSource, TargetSelector};
//! use stack_logs::endpoint::resolve;
//!
//! # async fn example() -> Result<(), stack_logs::LogError> {
//! let client = HttpLogClient::new(HttpClientConfig::new("http://localhost:3000/"))?;
//! let selector = TargetSelector::stack("srv-1", "shop")?.with_service("web");
//! let logs = client
//!     .fetch(&resolve(&selector), &LogQuery::default(), FetchMode::Blocking)
//!     .await?;
//! println!("{} lines", logs.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use crate::config::HttpClientConfig;
use crate::endpoint::ResourcePath;
use crate::error::{FetchError, LogError, Result};
use crate::types::{LogEntry, LogQuery};

/// Boxed future returned by [`LogSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = std::result::Result<Vec<LogEntry>, FetchError>> + Send + 'a>>;

/// How a fetch was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// User-initiated refresh or reconfiguration; drives the loading flag.
    Blocking,
    /// Scheduled background poll; must not disturb the visible state.
    Silent,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => f.write_str("blocking"),
            Self::Silent => f.write_str("silent"),
        }
    }
}

/// A source of log batches.
pub trait LogSource: Send + Sync {
    /// Fetch one batch of log entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers non-2xx.
    fn fetch<'a>(
        &'a self,
        endpoint: &'a ResourcePath,
        query: &'a LogQuery,
        mode: FetchMode,
    ) -> FetchFuture<'a>;
}

/// Success payload of the logs endpoints.
#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    logs: Option<Vec<LogEntry>>,
}

/// Error payload of the logs endpoints.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// HTTP implementation of [`LogSource`].
#[derive(Debug, Clone)]
pub struct HttpLogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpLogClient {
    /// Build a client for the API at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or the session cookie is invalid.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LogError::InvalidConfig(format!("invalid API URL {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(LogError::InvalidConfig(format!(
                "API URL {base_url} cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| LogError::InvalidConfig(format!("invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LogError::InvalidConfig(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    /// Base URL every endpoint is joined onto.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full request URL for an endpoint and query.
    #[must_use]
    pub fn request_url(&self, endpoint: &ResourcePath, query: &LogQuery) -> Url {
        let mut url = endpoint.url_for(&self.base_url);
        url.query_pairs_mut().extend_pairs(query.to_pairs());
        url
    }

    async fn fetch_logs(
        &self,
        endpoint: &ResourcePath,
        query: &LogQuery,
        mode: FetchMode,
    ) -> std::result::Result<Vec<LogEntry>, FetchError> {
        let url = self.request_url(endpoint, query);
        match mode {
            FetchMode::Blocking => debug!(url = %url, "Fetching logs"),
            FetchMode::Silent => trace!(url = %url, "Polling logs"),
        }

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), status.canonical_reason(), &body));
        }

        let body = response.bytes().await?;
        let logs = parse_logs_body(&body)?;
        trace!(%mode, count = logs.len(), "Received log batch");
        Ok(logs)
    }
}

impl LogSource for HttpLogClient {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a ResourcePath,
        query: &'a LogQuery,
        mode: FetchMode,
    ) -> FetchFuture<'a> {
        Box::pin(self.fetch_logs(endpoint, query, mode))
    }
}

/// Parses a 2xx body. A missing or null `logs` field is an empty batch.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not a logs payload.
pub fn parse_logs_body(body: &[u8]) -> std::result::Result<Vec<LogEntry>, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let response: LogsResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(response.logs.unwrap_or_default())
}

/// Maps a non-2xx response to a [`FetchError`].
///
/// The `error` string of a JSON body is preferred; otherwise the message is
/// the status line, `HTTP {status}: {reason}`.
#[must_use]
pub fn error_from_response(status: u16, reason: Option<&str>, body: &str) -> FetchError {
    let from_body = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|value| match value {
            serde_json::Value::String(message) if !message.trim().is_empty() => Some(message),
            _ => None,
        });

    let message = from_body
        .unwrap_or_else(|| format!("HTTP {status}: {}", reason.unwrap_or("Unknown Status")));
    FetchError::Http { status, message }
}
