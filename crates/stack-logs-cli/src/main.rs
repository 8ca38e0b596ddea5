//! `stacklogs` binary entrypoint.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use stack_logs::HttpLogClient;
use stack_logs_cli::cli::Cli;
use stack_logs_cli::output::OutputFormat;
use stack_logs_cli::tail::TailCommand;

fn main() -> ExitCode {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stack_logs=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = HttpLogClient::new(cli.client_config()).context("invalid API configuration")?;
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    TailCommand::new(&cli, Arc::new(client))
        .execute(&mut stdout, &format, shutdown)
        .await
        .with_context(|| format!("tailing {}/{}", cli.server, cli.stack))?;
    Ok(())
}
