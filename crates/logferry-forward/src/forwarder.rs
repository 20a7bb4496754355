//! The forwarder event loop
//!
//! A single actor task owns the backlog file and the outbound connection.
//! Helper tasks feed it events: a pump reading the local source, a
//! reconnect task dialing the collector, and a watcher that notices when
//! the peer hangs up. Chunks are handled strictly in arrival order, so
//! bytes reach the collector (or the backlog) in the order they were
//! produced locally.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use logferry_core::{constants, Error, Result, SinkAddress};

use crate::backlog::Backlog;
use crate::dial::Dialer;

/// Forwarder settings
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Name announced to the collector as the first line
    pub name: String,
    /// File holding the collector's address record
    pub address_file: PathBuf,
    /// Directory for the backlog spill file
    pub backlog_dir: PathBuf,
    /// Delay between reconnect attempts
    pub retry_delay: Duration,
    /// How long to keep draining the backlog after the source ends
    pub drain_grace: Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            address_file: constants::address_file(),
            backlog_dir: constants::backlog_dir(),
            retry_delay: Duration::from_secs(constants::DEFAULT_RETRY_DELAY_SECS),
            drain_grace: Duration::from_secs(constants::DEFAULT_DRAIN_GRACE_SECS),
        }
    }
}

/// Inbox events for the forwarder actor
enum Event<S> {
    /// A chunk read from the local source
    Chunk(Bytes),
    /// Clean end of the local source
    SourceEof,
    /// Read error on the local source
    SourceErr(std::io::Error),
    /// The reconnect task produced a fresh connection
    Connected(S),
    /// The watcher saw read EOF or a read error on the given connection
    PeerGone(u64),
}

/// Outbound link state
enum Link<S> {
    /// No usable connection; a reconnect task is dialing
    Down,
    /// Healthy connection; chunks are written directly
    Live {
        writer: WriteHalf<S>,
        cancel: CancellationToken,
    },
    /// Peer hung up; torn down and redialed when the next chunk arrives
    Stale,
}

/// Ships one local byte stream to the collector without ever losing bytes
pub struct Forwarder<D: Dialer> {
    config: ForwarderConfig,
    dialer: Arc<D>,
    backlog: Backlog,
}

impl<D: Dialer> Forwarder<D> {
    /// Create the forwarder and its backlog file
    ///
    /// Failing to create the backlog is fatal: without it the forwarder
    /// cannot honor its no-loss contract.
    pub fn new(config: ForwarderConfig, dialer: D) -> Result<Self> {
        let backlog = Backlog::create(&config.backlog_dir)?;
        Ok(Self {
            config,
            dialer: Arc::new(dialer),
            backlog,
        })
    }

    /// Route this process's own stdout and stderr into the backlog file
    #[cfg(unix)]
    pub fn capture_own_output(&self) -> Result<()> {
        self.backlog.capture_own_output()
    }

    pub fn backlog_path(&self) -> &Path {
        self.backlog.path()
    }

    /// Run until the local source ends
    ///
    /// Returns once the source hits EOF and the backlog has drained (or the
    /// grace period expired, leaving the file for a future forwarder). A
    /// source read error is the only fatal outcome.
    pub async fn run(self, input: impl AsyncRead + Send + Unpin + 'static) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_pump(input, tx.clone());

        let mut actor = Actor {
            config: self.config,
            dialer: self.dialer,
            backlog: self.backlog,
            link: Link::Down,
            generation: 0,
            tx,
        };
        actor.spawn_reconnect(false);

        while let Some(event) = rx.recv().await {
            match event {
                Event::Chunk(chunk) => actor.handle_chunk(chunk).await?,
                Event::Connected(stream) => actor.handle_connected(stream).await,
                Event::PeerGone(generation) => actor.handle_peer_gone(generation),
                Event::SourceEof => return actor.finish(rx).await,
                Event::SourceErr(err) => {
                    error!("Log source failed: {}", err);
                    return Err(Error::source(err.to_string()));
                }
            }
        }
        Ok(())
    }
}

struct Actor<D: Dialer> {
    config: ForwarderConfig,
    dialer: Arc<D>,
    backlog: Backlog,
    link: Link<D::Stream>,
    generation: u64,
    tx: mpsc::UnboundedSender<Event<D::Stream>>,
}

impl<D: Dialer> Actor<D> {
    /// Deliver one chunk: directly when live, to the backlog otherwise
    ///
    /// A backlog append failure is the one disk error that propagates; at
    /// that point the chunk can be neither sent nor stored.
    async fn handle_chunk(&mut self, chunk: Bytes) -> Result<()> {
        if let Link::Live { writer, .. } = &mut self.link {
            match writer.write_all(&chunk).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Write to log sink failed: {}", e),
            }
        }
        let was_down = matches!(self.link, Link::Down);
        self.teardown();
        self.backlog.append(&chunk)?;
        if !was_down {
            self.spawn_reconnect(false);
        }
        Ok(())
    }

    /// Bring a fresh connection up: announce our name, replay the backlog,
    /// then go live with a hangup watcher attached
    async fn handle_connected(&mut self, stream: D::Stream) {
        let mut stream = stream;
        let mut greeting = Vec::with_capacity(self.config.name.len() + 1);
        greeting.extend_from_slice(self.config.name.as_bytes());
        greeting.push(b'\n');
        if let Err(e) = stream.write_all(&greeting).await {
            warn!("Failed to announce name to log sink: {}", e);
            self.spawn_reconnect(false);
            return;
        }

        let mut buf = vec![0u8; constants::DRAIN_CHUNK_SIZE];
        loop {
            let n = match self.backlog.read_chunk(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    // The connection is fine but the file is not; back off
                    // before retrying so this cannot become a hot loop.
                    warn!("Backlog read failed during drain: {}", e);
                    self.spawn_reconnect(true);
                    return;
                }
            };
            if n == 0 {
                break;
            }
            if let Err(e) = stream.write_all(&buf[..n]).await {
                warn!("Connection lost while draining backlog: {}", e);
                self.spawn_reconnect(false);
                return;
            }
            // The cursor only moves past bytes the write call accepted
            self.backlog.advance(n);
        }
        if let Err(e) = self.backlog.reset() {
            warn!("Failed to truncate drained backlog: {}", e);
        }

        let (reader, writer) = tokio::io::split(stream);
        self.generation += 1;
        let cancel = CancellationToken::new();
        spawn_watcher(reader, self.generation, self.tx.clone(), cancel.clone());
        self.link = Link::Live { writer, cancel };
        info!("Connected to log sink, backlog drained");
    }

    /// The watcher saw the peer close its side
    ///
    /// The link is only marked stale; redialing waits for the next chunk,
    /// so an idle forwarder does not churn against a restarting collector.
    fn handle_peer_gone(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        if matches!(self.link, Link::Live { .. }) {
            info!("Log sink hung up, will reconnect on the next chunk");
            self.link = Link::Stale;
        }
    }

    fn teardown(&mut self) {
        if let Link::Live { cancel, .. } = std::mem::replace(&mut self.link, Link::Down) {
            cancel.cancel();
        }
    }

    /// Dial the collector until a connection lands in the inbox
    ///
    /// The address file is re-read on every attempt so the collector can
    /// move without this process restarting. At most one reconnect task is
    /// in flight; it ends after delivering a connection.
    fn spawn_reconnect(&self, delay_first: bool) {
        let dialer = Arc::clone(&self.dialer);
        let tx = self.tx.clone();
        let address_file = self.config.address_file.clone();
        let retry_delay = self.config.retry_delay;
        tokio::spawn(async move {
            if delay_first {
                tokio::time::sleep(retry_delay).await;
            }
            loop {
                match SinkAddress::read_from(&address_file) {
                    Ok(addr) => match dialer.dial(&addr).await {
                        Ok(stream) => {
                            let _ = tx.send(Event::Connected(stream));
                            return;
                        }
                        Err(e) => warn!("Failed to connect to log sink at {}: {}", addr, e),
                    },
                    Err(e) => warn!("Failed to read sink address: {}", e),
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(retry_delay).await;
            }
        });
    }

    /// The source ended; drain what is left, bounded by the grace period
    async fn finish(mut self, mut rx: mpsc::UnboundedReceiver<Event<D::Stream>>) -> Result<()> {
        if self.backlog.remaining()? == 0 {
            self.discard_backlog();
            return Ok(());
        }
        info!(
            "Log source ended, draining backlog for up to {:?}",
            self.config.drain_grace
        );
        match timeout(self.config.drain_grace, self.drain_remaining(&mut rx)).await {
            Ok(result) => result,
            Err(_) => {
                info!(
                    "Backlog not drained in time, leaving {} for a future forwarder",
                    self.backlog.path().display()
                );
                Ok(())
            }
        }
    }

    async fn drain_remaining(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Event<D::Stream>>,
    ) -> Result<()> {
        loop {
            if self.backlog.remaining()? == 0 {
                self.discard_backlog();
                return Ok(());
            }
            match rx.recv().await {
                Some(Event::Connected(stream)) => self.handle_connected(stream).await,
                Some(Event::PeerGone(generation)) => self.handle_peer_gone(generation),
                Some(_) => {}
                None => return Ok(()),
            }
        }
    }

    fn discard_backlog(&self) {
        if let Err(e) = self.backlog.remove() {
            warn!("Failed to remove drained backlog file: {}", e);
        } else {
            debug!("Removed drained backlog file");
        }
    }
}

/// Read the local source and feed the inbox, in order
fn spawn_pump<R, S>(mut input: R, tx: mpsc::UnboundedSender<Event<S>>)
where
    R: AsyncRead + Send + Unpin + 'static,
    S: Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; constants::SOURCE_CHUNK_SIZE];
        loop {
            match input.read(&mut buf).await {
                Ok(0) => {
                    let _ = tx.send(Event::SourceEof);
                    return;
                }
                Ok(n) => {
                    if tx.send(Event::Chunk(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Event::SourceErr(e));
                    return;
                }
            }
        }
    });
}

/// Keep reading the connection purely to notice the peer closing it
///
/// Without an active reader a writer never learns about a half-closed TCP
/// connection in time; writes would keep "succeeding" into the void.
fn spawn_watcher<S>(
    mut reader: ReadHalf<S>,
    generation: u64,
    tx: mpsc::UnboundedSender<Event<S>>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    tokio::spawn(async move {
        let mut scratch = [0u8; constants::WATCH_BUFFER_SIZE];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                read = reader.read(&mut scratch) => match read {
                    // The collector never talks back; discard stray bytes
                    Ok(n) if n > 0 => {}
                    _ => {
                        let _ = tx.send(Event::PeerGone(generation));
                        return;
                    }
                },
            }
        }
    });
}
