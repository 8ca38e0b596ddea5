//! The tail command.
//!
//! Loads the current tail with a blocking fetch, prints it, then follows
//! the poll scheduler and prints every newly merged visible line until
//! the shutdown future resolves.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use stack_logs::{LogSource, LogViewer};
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for the tail command.
pub struct TailCommand<'a> {
    cli: &'a Cli,
    source: Arc<dyn LogSource>,
}

impl<'a> TailCommand<'a> {
    /// Creates a new tail command handler.
    #[must_use]
    pub fn new(cli: &'a Cli, source: Arc<dyn LogSource>) -> Self {
        Self { cli, source }
    }

    /// Executes the tail command. Returns the number of lines printed.
    ///
    /// With `--no-follow` this returns right after the first fetch;
    /// otherwise it keeps polling until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the flags are invalid, if the initial load fails
    /// without `--no-follow` being able to recover, or if writing fails.
    pub async fn execute<W, F>(&self, out: &mut W, format: &OutputFormat, shutdown: F) -> Result<usize, CliError>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let mut viewer = LogViewer::new(
            Arc::clone(&self.source),
            self.cli.selector()?,
            self.cli.query()?,
            self.cli.viewer_config(),
        );
        viewer.set_search(self.cli.grep.as_str());
        viewer.set_level_filter(self.cli.level);

        info!(selector = %viewer.selector(), endpoint = %viewer.endpoint(), "Tailing logs");
        viewer.refresh().await;

        if let Some(message) = viewer.state().error.clone() {
            if self.cli.no_follow {
                return Err(CliError::Fetch(message));
            }
            warn!(error = %message, "Initial load failed, waiting for the next poll");
        }

        let mut printed = format.write_entries(out, viewer.visible())?;
        out.flush()?;

        if !self.cli.no_follow {
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    () = &mut shutdown => {
                        debug!("Shutdown requested");
                        break;
                    }
                    event = viewer.next_poll() => {
                        let Some(event) = event else { break };
                        let outcome = viewer.apply_poll(event);
                        if outcome.changed() {
                            printed += format.write_entries(out, viewer.appended(&outcome))?;
                            out.flush()?;
                        }
                    }
                }
            }
        }

        if self.cli.stats {
            format.write(out, &viewer.stats())?;
        }
        Ok(printed)
    }
}
