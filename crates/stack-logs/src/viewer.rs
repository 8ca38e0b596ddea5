//! Log viewer session.
//!
//! [`LogViewer`] owns the buffer and the session flags for one tailing
//! target and routes every mutation through the engines: blocking fetches
//! replace the buffer, poll results from the [`PollScheduler`] are merged,
//! and each change is reflected in the follow controller.
//!
//! The viewer is driven by a single task. Poll results arrive over a
//! channel and are applied with [`LogViewer::apply_poll`]:
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use stack_logs::{HttpClientConfig, HttpLogClient, LogQuery, LogViewer, TargetSelector, ViewerConfig};
//! # async fn example() -> Result<(), stack_logs::LogError> {
//! let client = Arc::new(HttpLogClient::new(HttpClientConfig::default())?);
//! let selector = TargetSelector::stack("srv-1", "shop")?;
//! let mut viewer = LogViewer::new(client, selector, LogQuery::default(), ViewerConfig::default());
//!
//! viewer.refresh().await;
//! while let Some(event) = viewer.next_poll().await {
//!     let outcome = viewer.apply_poll(event);
//!     for line in viewer.appended_lines(&outcome) {
//!         println!("{line}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::buffer::LogBuffer;
use crate::client::{FetchMode, LogSource};
use crate::config::ViewerConfig;
use crate::endpoint::{ResourcePath, resolve};
use crate::filter::{LogStats, ViewFilter};
use crate::follow::FollowController;
use crate::merge::{MergeOutcome, Watermark, apply_batch};
use crate::render::{format_entry, truncate};
use crate::scheduler::{PollEvent, PollJob, PollScheduler, poll_channel};
use crate::types::{LevelFilter, LogEntry, LogQuery, TargetSelector};

/// Flags describing what the viewer is doing and how the last fetch went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// A blocking fetch is in progress.
    pub loading: bool,
    /// A silent poll is in progress.
    pub checking: bool,
    /// Message of the last failed blocking fetch.
    pub error: Option<String>,
    /// Whether silent polling is enabled.
    pub auto_refresh: bool,
    /// When a fetch last succeeded.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Live view over the logs of one target.
pub struct LogViewer {
    source: Arc<dyn LogSource>,
    selector: TargetSelector,
    endpoint: ResourcePath,
    query: LogQuery,
    buffer: LogBuffer,
    watermark: Watermark,
    filter: ViewFilter,
    follow: FollowController,
    scheduler: PollScheduler,
    events: mpsc::Receiver<PollEvent>,
    generation: u64,
    state: SessionState,
}

impl std::fmt::Debug for LogViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogViewer")
            .field("selector", &self.selector)
            .field("query", &self.query)
            .field("entries", &self.buffer.len())
            .field("watermark", &self.watermark)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LogViewer {
    /// Creates an idle viewer with an empty buffer.
    ///
    /// Nothing is fetched until [`refresh`](Self::refresh) is called.
    #[must_use]
    pub fn new(source: Arc<dyn LogSource>, selector: TargetSelector, query: LogQuery, config: ViewerConfig) -> Self {
        let (tx, rx) = poll_channel();
        Self {
            source,
            endpoint: resolve(&selector),
            selector,
            query,
            buffer: LogBuffer::new(config.buffer_capacity),
            watermark: Watermark::unknown(),
            filter: ViewFilter::default(),
            follow: FollowController::new(config.follow_threshold),
            scheduler: PollScheduler::new(config.poll_interval, tx),
            events: rx,
            generation: 0,
            state: SessionState {
                auto_refresh: config.auto_refresh,
                ..SessionState::default()
            },
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current target.
    #[must_use]
    pub const fn selector(&self) -> &TargetSelector {
        &self.selector
    }

    /// Current query.
    #[must_use]
    pub const fn query(&self) -> &LogQuery {
        &self.query
    }

    /// Resolved logs resource for the current target.
    #[must_use]
    pub const fn endpoint(&self) -> &ResourcePath {
        &self.endpoint
    }

    /// Retained entries, unfiltered.
    #[must_use]
    pub const fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Dedup boundary.
    #[must_use]
    pub const fn watermark(&self) -> &Watermark {
        &self.watermark
    }

    /// Session flags.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Follow-mode state and scroll position.
    #[must_use]
    pub const fn follow(&self) -> &FollowController {
        &self.follow
    }

    /// Active search and level filter.
    #[must_use]
    pub const fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    /// Configuration generation; bumped whenever earlier poll results must
    /// no longer apply.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// When a fetch last succeeded.
    #[must_use]
    pub const fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.last_updated
    }

    /// Returns true while the poll timer is armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.scheduler.is_polling()
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Performs a blocking fetch that replaces the buffer.
    ///
    /// Polling is suspended for the duration of the fetch and re-armed
    /// afterwards if auto-refresh is on. On failure the buffer is cleared
    /// and the error message is kept in [`SessionState::error`].
    pub async fn refresh(&mut self) -> MergeOutcome {
        self.scheduler.stop();
        self.generation += 1;
        self.state.loading = true;
        self.state.checking = false;

        debug!(selector = %self.selector, generation = self.generation, "Refreshing logs");
        let result = self
            .source
            .fetch(&self.endpoint, &self.query, FetchMode::Blocking)
            .await;

        let outcome = match result {
            Ok(logs) => {
                let outcome = apply_batch(&mut self.buffer, logs, &mut self.watermark, FetchMode::Blocking);
                self.state.error = None;
                self.state.last_updated = Some(Utc::now());
                outcome
            }
            Err(err) => {
                warn!(selector = %self.selector, error = %err, "Failed to load logs");
                self.buffer.clear();
                self.watermark = Watermark::unknown();
                self.state.error = Some(err.to_string());
                MergeOutcome {
                    replaced: true,
                    ..MergeOutcome::default()
                }
            }
        };

        self.state.loading = false;
        self.sync_follow();
        self.arm();
        outcome
    }

    /// Switches to another target.
    ///
    /// The buffer is reset and refetched; merging across targets never
    /// happens. Selecting the current target does nothing.
    pub async fn set_selector(&mut self, selector: TargetSelector) -> Option<MergeOutcome> {
        if selector == self.selector {
            return None;
        }
        info!(from = %self.selector, to = %selector, "Switching log target");
        self.endpoint = resolve(&selector);
        self.selector = selector;
        self.clear();
        Some(self.refresh().await)
    }

    /// Replaces the query, resetting and refetching like a target switch.
    pub async fn set_query(&mut self, query: LogQuery) -> Option<MergeOutcome> {
        if query == self.query {
            return None;
        }
        debug!(tail = query.tail(), since = query.since().unwrap_or(""), "Changing log query");
        self.query = query;
        self.clear();
        Some(self.refresh().await)
    }

    /// Enables or disables silent polling.
    ///
    /// Enabling arms the timer; the first poll fires one interval later.
    /// Must be called from within a tokio runtime.
    pub fn set_auto_refresh(&mut self, enabled: bool) {
        if self.state.auto_refresh == enabled && self.scheduler.is_polling() == enabled {
            return;
        }
        self.state.auto_refresh = enabled;
        if enabled {
            self.arm();
        } else {
            self.scheduler.stop();
            self.state.checking = false;
        }
    }

    /// Waits for the next message from the poll timer.
    ///
    /// Poll events queue up in a small bounded channel. While it is full,
    /// ticks are skipped without fetching, so polling only makes progress
    /// when this is called.
    pub async fn next_poll(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Applies a message from the poll timer.
    ///
    /// Messages issued under an older generation are dropped. A failed poll
    /// leaves the buffer and the error state as they were.
    pub fn apply_poll(&mut self, event: PollEvent) -> MergeOutcome {
        if event.generation() != self.generation {
            trace!(
                stale = event.generation(),
                current = self.generation,
                "Ignoring poll result from an earlier configuration"
            );
            return MergeOutcome::default();
        }

        match event {
            PollEvent::Checking { .. } => {
                self.state.checking = true;
                MergeOutcome::default()
            }
            PollEvent::Completed { result, .. } => {
                self.state.checking = false;
                match result {
                    Ok(logs) => {
                        let outcome = apply_batch(&mut self.buffer, logs, &mut self.watermark, FetchMode::Silent);
                        self.state.last_updated = Some(Utc::now());
                        if outcome.changed() {
                            trace!(
                                appended = outcome.appended,
                                evicted = outcome.evicted,
                                total = self.buffer.len(),
                                "Merged poll result"
                            );
                            self.sync_follow();
                        }
                        outcome
                    }
                    Err(err) => {
                        warn!(selector = %self.selector, error = %err, "Background log refresh failed");
                        MergeOutcome::default()
                    }
                }
            }
        }
    }

    /// Clears the buffer, the watermark and the error.
    ///
    /// Results of polls already in flight are discarded. If polling, the
    /// next tick starts over with a full tail.
    pub fn reset(&mut self) {
        self.clear();
        self.generation += 1;
        if self.scheduler.is_polling() {
            self.arm();
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.watermark = Watermark::unknown();
        self.state.error = None;
        self.state.checking = false;
        self.sync_follow();
    }

    fn arm(&mut self) {
        if !self.state.auto_refresh {
            return;
        }
        self.scheduler.start(PollJob {
            source: Arc::clone(&self.source),
            endpoint: self.endpoint.clone(),
            query: self.query.clone(),
            generation: self.generation,
        });
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    /// Sets the free-text search.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter = ViewFilter::new(search, self.filter.level());
        self.sync_follow();
    }

    /// Sets the level filter.
    pub fn set_level_filter(&mut self, level: LevelFilter) {
        self.filter = ViewFilter::new(self.filter.search(), level);
        self.sync_follow();
    }

    /// Entries passing the current filter, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &LogEntry> + Clone + '_ {
        self.filter.apply(&self.buffer)
    }

    /// Visible entries within the viewport. With no viewport set, every
    /// visible entry from the scroll offset on.
    pub fn window(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let rows = match self.follow.viewport() {
            0 => usize::MAX,
            rows => rows,
        };
        self.visible().skip(self.follow.offset()).take(rows)
    }

    /// Per-level counts over the whole buffer.
    #[must_use]
    pub fn stats(&self) -> LogStats {
        LogStats::from_entries(&self.buffer)
    }

    /// Formats every visible entry, optionally cut to `width` characters.
    #[must_use]
    pub fn render_lines(&self, width: Option<usize>) -> Vec<String> {
        self.visible().map(|entry| render(entry, width)).collect()
    }

    /// Visible entries added by `outcome`, oldest first.
    ///
    /// After a replace this is the whole visible buffer.
    #[must_use]
    pub fn appended(&self, outcome: &MergeOutcome) -> Vec<&LogEntry> {
        let fresh = if outcome.replaced {
            self.buffer.len()
        } else {
            outcome.appended
        };
        self.filter.apply(self.buffer.newest(fresh)).collect()
    }

    /// Formats the visible entries added by `outcome`.
    #[must_use]
    pub fn appended_lines(&self, outcome: &MergeOutcome) -> Vec<String> {
        self.appended(outcome)
            .into_iter()
            .map(|entry| render(entry, None))
            .collect()
    }

    // ------------------------------------------------------------------
    // Follow mode
    // ------------------------------------------------------------------

    /// Records the viewport height in lines.
    pub fn set_viewport(&mut self, rows: usize) {
        self.follow.set_viewport(rows);
    }

    /// Handles a manual scroll to `offset`.
    pub fn on_scroll(&mut self, offset: usize) {
        self.follow.on_scroll(offset);
    }

    /// Flips follow mode. Returns the new state.
    pub fn toggle_follow(&mut self) -> bool {
        self.follow.toggle()
    }

    /// Scrolls to the newest entry without changing follow mode.
    pub fn jump_to_newest(&mut self) {
        self.follow.jump_to_newest();
    }

    fn sync_follow(&mut self) {
        let content = if self.filter.is_pass_through() {
            self.buffer.len()
        } else {
            self.visible().count()
        };
        self.follow.on_content_changed(content);
    }
}

fn render(entry: &LogEntry, width: Option<usize>) -> String {
    let line = format_entry(entry);
    match width {
        Some(width) => truncate(&line, width).to_string(),
        None => line,
    }
}
