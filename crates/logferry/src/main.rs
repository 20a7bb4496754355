//! logferry CLI - cluster log forwarding, collection, and rotation

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Diagnostics go to stderr: in `collect` and `rotate`, stdout carries
    // the log stream itself.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("logferry={}", log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Forward(args) => commands::forward::execute(args, config).await,
        Commands::Collect(args) => commands::collect::execute(args, config).await,
        Commands::Rotate(args) => commands::rotate::execute(args, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
