//! Forward command implementation - ships stdin to the collector

use std::time::Duration;

use anyhow::Result;
use tracing::info;

use logferry_core::{constants, ConfigFile, ForwardSection};
use logferry_forward::{Forwarder, ForwarderConfig, TcpDialer};

use crate::cli::ForwardArgs;

pub async fn execute(args: ForwardArgs, config: ConfigFile) -> Result<()> {
    let fw_config = resolve(&args, &config.forward);
    info!(
        "Forwarding as {} via {}",
        fw_config.name,
        fw_config.address_file.display()
    );

    let forwarder = Forwarder::new(fw_config, TcpDialer::default())?;
    info!("Backlog at {}", forwarder.backlog_path().display());
    #[cfg(unix)]
    if !args.no_capture_self {
        forwarder.capture_own_output()?;
    }
    forwarder.run(tokio::io::stdin()).await?;
    Ok(())
}

fn resolve(args: &ForwardArgs, file: &ForwardSection) -> ForwarderConfig {
    ForwarderConfig {
        name: args
            .name
            .clone()
            .or_else(|| file.name.clone())
            .unwrap_or_else(default_name),
        address_file: args
            .address_file
            .clone()
            .or_else(|| file.address_file.clone())
            .unwrap_or_else(constants::address_file),
        backlog_dir: args
            .backlog_dir
            .clone()
            .or_else(|| file.backlog_dir.clone())
            .unwrap_or_else(constants::backlog_dir),
        retry_delay: Duration::from_secs(
            args.retry_delay
                .or(file.retry_delay_secs)
                .unwrap_or(constants::DEFAULT_RETRY_DELAY_SECS),
        ),
        drain_grace: Duration::from_secs(
            args.drain_grace
                .or(file.drain_grace_secs)
                .unwrap_or(constants::DEFAULT_DRAIN_GRACE_SECS),
        ),
    }
}

/// This machine's hostname, used when no name is configured
fn default_name() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
