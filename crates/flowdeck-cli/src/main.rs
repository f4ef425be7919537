#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;

use std::process;

use anyhow::Context;
use flowdeck_client::ApiClient;
use flowdeck_state::WorkflowSession;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "flowdeck_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "flowdeck_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "flowdeck_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "flowdeck_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "command completed successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = format!("{error:#}"),
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let client = ApiClient::new(cli.api.clone()).context("failed to create API client")?;
    let session = WorkflowSession::new(client.into_service());

    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        command = cli.command.name(),
        "Running command"
    );

    let output = cli.command.execute(&session).await?;
    let rendered = serde_json::to_string_pretty(&output).context("failed to render output")?;
    println!("{rendered}");

    session.close().await;
    Ok(())
}
