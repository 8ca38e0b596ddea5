//! # stack-logs-cli
//!
//! The `stacklogs` command: tails the logs of a Stackdeck stack, service or
//! container from the terminal.
//!
//! One blocking fetch prints the current tail; unless `--no-follow` is
//! given, the command keeps polling and prints newly merged lines until
//! interrupted.
//!
//! ```text
//! ┌───────────┐   GET .../logs?tail=..   ┌──────────────────┐
//! │ stacklogs │─────────────────────────►│  management API  │
//! └───────────┘   (every 5 s, silent)    └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod error;
pub mod output;
pub mod tail;

pub use cli::{Cli, Format};
pub use error::CliError;
pub use output::{OutputFormat, TextDisplay};
