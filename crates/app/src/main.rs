//! Taskin command-line client
//!
//! Wires settings, the on-disk cache and the HTTP API into a `TaskClient`
//! and runs one command against it.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    tracing::debug!(data_dir = %cli.data_dir.display(), "Starting Taskin client");

    commands::run(cli).await
}
