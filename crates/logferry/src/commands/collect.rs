//! Collect command implementation - merges forwarder streams onto stdout

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use logferry_core::{constants, CollectSection, ConfigFile, SinkAddress};
use logferry_sink::LogSink;

use crate::cli::CollectArgs;

pub async fn execute(args: CollectArgs, config: ConfigFile) -> Result<()> {
    let (listen, publish) = resolve(&args, &config.collect);

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("cannot listen on {}", listen))?;
    let local = listener.local_addr()?;
    info!("Collecting on {}", local);

    if let Some(path) = publish {
        SinkAddress::from(local)
            .write_to(&path)
            .with_context(|| format!("cannot publish address to {}", path.display()))?;
        info!("Published address to {}", path.display());
    }

    let sink = Arc::new(LogSink::new(std::io::stdout()));
    sink.listen(listener).await?;
    Ok(())
}

fn resolve(args: &CollectArgs, file: &CollectSection) -> (SocketAddr, Option<PathBuf>) {
    let listen = args
        .listen
        .or(file.listen)
        .unwrap_or_else(constants::default_listen_addr);
    let publish = args.publish.clone().or_else(|| file.publish.clone());
    (listen, publish)
}
