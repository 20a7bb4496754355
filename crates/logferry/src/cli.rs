//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logferry")]
#[command(version, about = "Ship, merge, and rotate logs across a cluster")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (default: ./logferry.toml, then ~/.logferry/logferry.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ship stdin to the collector, spooling to a backlog while it is unreachable
    Forward(ForwardArgs),

    /// Accept forwarder connections and merge them into one labeled stream on stdout
    Collect(CollectArgs),

    /// Split stdin into one log file per UTC day
    Rotate(RotateArgs),
}

#[derive(Args)]
pub struct ForwardArgs {
    /// Name announced to the collector (default: this machine's hostname)
    #[arg(short, long)]
    pub name: Option<String>,

    /// File holding the collector's address record
    #[arg(long)]
    pub address_file: Option<PathBuf>,

    /// Directory for backlog spill files
    #[arg(long)]
    pub backlog_dir: Option<PathBuf>,

    /// Seconds between reconnect attempts
    #[arg(long)]
    pub retry_delay: Option<u64>,

    /// Seconds to keep draining the backlog after stdin closes
    #[arg(long)]
    pub drain_grace: Option<u64>,

    /// Keep this process's own stdout/stderr instead of routing them into the backlog
    #[arg(long)]
    pub no_capture_self: bool,
}

#[derive(Args)]
pub struct CollectArgs {
    /// Address to listen on for forwarder connections (default: 0.0.0.0:9440)
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Write the bound address to this file for forwarders to pick up
    #[arg(short, long)]
    pub publish: Option<PathBuf>,
}

#[derive(Args)]
pub struct RotateArgs {
    /// Directory receiving the day files
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// File name prefix for day files and the current pointer
    #[arg(long)]
    pub prefix: Option<String>,
}
