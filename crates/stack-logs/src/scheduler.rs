//! Poll scheduler.
//!
//! A two-state machine (**Idle** / **Polling**) owning at most one timer
//! task. While polling, every tick performs a silent fetch and sends the
//! outcome back to the owner over a channel; the owner merges it. Arming a
//! new timer always cancels the previous one first, and dropping the
//! scheduler cancels whatever is pending.
//!
//! Events travel over a bounded channel. When the owner has not drained
//! the previous events, a tick is skipped without fetching.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::client::{FetchMode, LogSource};
use crate::endpoint::ResourcePath;
use crate::error::FetchError;
use crate::types::{LogEntry, LogQuery};

/// Shortest accepted tick period; shorter ones, including zero, are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Capacity of the channel between the timer task and its owner.
pub const POLL_CHANNEL_CAPACITY: usize = 8;

/// Creates the channel a [`PollScheduler`] reports to.
#[must_use]
pub fn poll_channel() -> (mpsc::Sender<PollEvent>, mpsc::Receiver<PollEvent>) {
    mpsc::channel(POLL_CHANNEL_CAPACITY)
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timer armed.
    Idle,
    /// A timer is armed and ticking.
    Polling,
}

/// Message sent from the timer task to the viewer.
#[derive(Debug)]
pub enum PollEvent {
    /// A silent fetch has started.
    Checking {
        /// Configuration generation the poll was issued under.
        generation: u64,
    },
    /// A silent fetch has finished.
    Completed {
        /// Configuration generation the poll was issued under.
        generation: u64,
        /// Fetched batch or failure.
        result: Result<Vec<LogEntry>, FetchError>,
    },
}

impl PollEvent {
    /// Configuration generation the poll was issued under.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Checking { generation } | Self::Completed { generation, .. } => *generation,
        }
    }
}

/// Everything a timer task needs to poll one configuration.
#[derive(Clone)]
pub struct PollJob {
    /// Where batches come from.
    pub source: Arc<dyn LogSource>,
    /// Resolved logs resource.
    pub endpoint: ResourcePath,
    /// Query sent on every tick.
    pub query: LogQuery,
    /// Configuration generation stamped on every event.
    pub generation: u64,
}

impl std::fmt::Debug for PollJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollJob")
            .field("endpoint", &self.endpoint)
            .field("query", &self.query)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    generation: u64,
}

/// Owns the repeating poll timer.
#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    events: mpsc::Sender<PollEvent>,
    task: Option<PollTask>,
}

impl PollScheduler {
    /// Creates an idle scheduler that reports to `events`.
    ///
    /// An `interval` below [`MIN_POLL_INTERVAL`] is raised to it.
    #[must_use]
    pub fn new(interval: Duration, events: mpsc::Sender<PollEvent>) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            events,
            task: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        match &self.task {
            Some(task) if !task.handle.is_finished() => SchedulerState::Polling,
            _ => SchedulerState::Idle,
        }
    }

    /// Returns true while a timer is armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.state() == SchedulerState::Polling
    }

    /// Generation of the armed timer, if any.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.task.as_ref().map(|task| task.generation)
    }

    /// Tick period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms a timer for `job`, cancelling any existing one first.
    ///
    /// The first tick fires one full period after arming. Must be called
    /// from within a tokio runtime.
    pub fn start(&mut self, job: PollJob) {
        self.stop();

        let cancel = CancellationToken::new();
        let generation = job.generation;
        debug!(
            endpoint = %job.endpoint,
            generation,
            interval_ms = self.interval.as_millis() as u64,
            "Starting log polling"
        );
        let first_tick = Instant::now() + self.interval;
        let handle = tokio::spawn(run_poll_loop(
            job,
            first_tick,
            self.interval,
            cancel.clone(),
            self.events.clone(),
        ));
        self.task = Some(PollTask {
            cancel,
            handle,
            generation,
        });
    }

    /// Cancels the armed timer. Returns true if one was armed.
    ///
    /// A fetch already in flight is allowed to finish, but its result is
    /// discarded.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.cancel.cancel();
        debug!(generation = task.generation, "Stopped log polling");
        true
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll_loop(
    job: PollJob,
    first_tick: Instant,
    interval: Duration,
    cancel: CancellationToken,
    events: mpsc::Sender<PollEvent>,
) {
    let generation = job.generation;
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if events.is_closed() {
            break;
        }
        // Room for both the checking and the completed event.
        if events.capacity() < 2 {
            trace!(generation, "Skipping poll tick, events not drained");
            continue;
        }

        trace!(generation, "Poll tick");
        match events.try_send(PollEvent::Checking { generation }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => continue,
            Err(TrySendError::Closed(_)) => break,
        }

        let result = job
            .source
            .fetch(&job.endpoint, &job.query, FetchMode::Silent)
            .await;

        if cancel.is_cancelled() {
            trace!(generation, "Discarding poll result after cancellation");
            break;
        }
        match events.try_send(PollEvent::Completed { generation, result }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!(generation, "Dropping poll result, events not drained"),
            Err(TrySendError::Closed(_)) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FetchFuture;
    use crate::endpoint::resolve;
    use crate::types::TargetSelector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PERIOD: Duration = Duration::from_millis(5000);

    /// Source that counts calls and returns one entry per call.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LogSource for CountingSource {
        fn fetch<'a>(
            &'a self,
            _endpoint: &'a ResourcePath,
            _query: &'a LogQuery,
            mode: FetchMode,
        ) -> FetchFuture<'a> {
            Box::pin(async move {
                assert_eq!(mode, FetchMode::Silent);
                let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(vec![LogEntry::new(format!("2024-05-01T10:00:{n:02}Z"), format!("poll {n}"))])
            })
        }
    }

    fn job(source: Arc<CountingSource>, generation: u64) -> PollJob {
        let selector = TargetSelector::stack("srv-1", "shop").expect("valid");
        PollJob {
            source,
            endpoint: resolve(&selector),
            query: LogQuery::default(),
            generation,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_fires_after_one_period() {
        let (tx, mut rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        let mut scheduler = PollScheduler::new(PERIOD, tx);

        scheduler.start(job(source.clone(), 1));
        assert_eq!(scheduler.state(), SchedulerState::Polling);

        tokio::time::advance(PERIOD - Duration::from_millis(1)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(source.calls(), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        let checking = rx.recv().await.expect("checking event");
        assert!(matches!(checking, PollEvent::Checking { generation: 1 }));
        let completed = rx.recv().await.expect("completed event");
        assert!(matches!(
            &completed,
            PollEvent::Completed { generation: 1, result: Ok(logs) } if logs.len() == 1
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_every_period() {
        let (tx, mut rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        let mut scheduler = PollScheduler::new(PERIOD, tx);
        scheduler.start(job(source.clone(), 7));

        let mut completed = 0;
        while completed < 3 {
            if let Some(PollEvent::Completed { generation, .. }) = rx.recv().await {
                assert_eq!(generation, 7);
                completed += 1;
            }
        }
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_fetches() {
        let (tx, mut rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        let mut scheduler = PollScheduler::new(PERIOD, tx);
        scheduler.start(job(source.clone(), 1));

        tokio::time::sleep(PERIOD).await;
        settle().await;
        let before = source.calls();
        assert_eq!(before, 1);

        assert!(scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.stop());

        tokio::time::sleep(PERIOD * 10).await;
        settle().await;
        assert_eq!(source.calls(), before);

        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.generation(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_timer() {
        let (tx, mut rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        let mut scheduler = PollScheduler::new(PERIOD, tx);

        scheduler.start(job(source.clone(), 1));
        scheduler.start(job(source.clone(), 2));
        scheduler.start(job(source.clone(), 3));
        assert_eq!(scheduler.generation(), Some(3));

        tokio::time::sleep(PERIOD * 2).await;
        settle().await;
        assert_eq!(source.calls(), 2);

        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.generation(), 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_scheduler_cancels_timer() {
        let (tx, _rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        {
            let mut scheduler = PollScheduler::new(PERIOD, tx);
            scheduler.start(job(source.clone(), 1));
        }

        tokio::time::sleep(PERIOD * 5).await;
        settle().await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_to_minimum() {
        let (tx, mut rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        let mut scheduler = PollScheduler::new(Duration::ZERO, tx);
        assert_eq!(scheduler.interval(), MIN_POLL_INTERVAL);

        scheduler.start(job(source.clone(), 1));
        assert!(matches!(rx.recv().await, Some(PollEvent::Checking { generation: 1 })));
        assert!(matches!(rx.recv().await, Some(PollEvent::Completed { generation: 1, .. })));
        assert!(scheduler.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_skipped_until_events_are_drained() {
        let (tx, mut rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        let mut scheduler = PollScheduler::new(PERIOD, tx);
        scheduler.start(job(source.clone(), 1));

        tokio::time::sleep(PERIOD * 10).await;
        settle().await;
        assert_eq!(source.calls(), POLL_CHANNEL_CAPACITY / 2);
        assert!(scheduler.is_polling());

        let mut drained = 0;
        while rx.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, POLL_CHANNEL_CAPACITY);

        tokio::time::sleep(PERIOD).await;
        settle().await;
        assert_eq!(source.calls(), POLL_CHANNEL_CAPACITY / 2 + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ends_when_receiver_is_gone() {
        let (tx, rx) = poll_channel();
        let source = Arc::new(CountingSource::default());
        let mut scheduler = PollScheduler::new(PERIOD, tx);
        scheduler.start(job(source.clone(), 1));
        drop(rx);

        tokio::time::sleep(PERIOD * 3).await;
        settle().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(source.calls(), 0);
    }
}
