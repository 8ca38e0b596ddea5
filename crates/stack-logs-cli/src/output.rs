//! Output formatting for the tail command.
//!
//! Entries are written as formatted text lines or as one JSON object per
//! line, so `--format json` can be piped into `jq`.

use std::io::Write;

use serde::Serialize;
use stack_logs::{LogEntry, LogLevel, LogStats, format_entry};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both text and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write log entries, one per line. Returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_entries<'a, W, I>(&self, writer: &mut W, entries: I) -> Result<usize, CliError>
    where
        W: Write,
        I: IntoIterator<Item = &'a LogEntry>,
    {
        let mut written = 0;
        for entry in entries {
            match self.format {
                Format::Json => {
                    serde_json::to_writer(&mut *writer, entry)
                        .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                    writeln!(writer)?;
                }
                Format::Text => writeln!(writer, "{}", format_entry(entry))?,
            }
            written += 1;
        }
        Ok(written)
    }

    /// Write a summary value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TextDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Text => value.write_text(writer)?,
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Text)
    }
}

/// Trait for values with a human-readable rendering.
pub trait TextDisplay {
    /// Write the value as human-readable text.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TextDisplay for LogStats {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Log Summary")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "  Total:          {}", self.total)?;
        for level in LogLevel::ALL.iter().rev() {
            let label = format!("{}:", level.as_str().to_uppercase());
            writeln!(writer, "  {label:<16}{}", self.count(*level))?;
        }
        Ok(())
    }
}
