//! The collector's shared output stream and name registry

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use logferry_core::constants;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::handler::ClientHandler;

/// Serializes all attributed log lines onto one output stream
pub struct LogSink {
    output: Mutex<Box<dyn Write + Send>>,
    names: Mutex<HashSet<String>>,
}

impl LogSink {
    pub fn new(output: impl Write + Send + 'static) -> Self {
        Self {
            output: Mutex::new(Box::new(output)),
            names: Mutex::new(HashSet::new()),
        }
    }

    /// Write one timestamped entry as two parts
    ///
    /// The parts carry their own newlines; nothing is inserted between them.
    pub fn write_parts(&self, part1: &[u8], part2: &[u8]) -> std::io::Result<()> {
        let timestamp = Utc::now().format(constants::TIMESTAMP_FORMAT);
        let mut output = self.output.lock();
        write!(output, "{}", timestamp)?;
        output.write_all(part1)?;
        output.write_all(part2)?;
        output.flush()
    }

    /// Reserve a unique label, suffixing `.1`, `.2`, ... on collision
    ///
    /// Labels are never released. A label freed by a disconnect must not be
    /// handed to an unrelated stream while someone is tailing the output.
    pub fn claim_name(&self, base: &str) -> String {
        let mut names = self.names.lock();
        if names.insert(base.to_string()) {
            return base.to_string();
        }
        let mut counter = 1u32;
        loop {
            let candidate = format!("{}.{}", base, counter);
            if names.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Accept forwarder connections forever
    ///
    /// Each connection runs in its own task; a failure in one handler never
    /// disturbs the others or the accept loop itself.
    pub async fn listen(self: Arc<Self>, listener: TcpListener) -> logferry_core::Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Log connection from {}", peer);
                    let sink = Arc::clone(&self);
                    tokio::spawn(async move {
                        let handler = ClientHandler::new(sink, stream, peer.to_string());
                        if let Err(e) = handler.run().await {
                            warn!("Log connection from {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => warn!("Failed to accept log connection: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn raw(output: &SharedBuf) -> String {
        String::from_utf8(output.0.lock().clone()).unwrap()
    }

    #[test]
    fn test_claim_name_dedups_with_suffixes() {
        let sink = LogSink::new(SharedBuf::default());
        assert_eq!(sink.claim_name("worker"), "worker");
        assert_eq!(sink.claim_name("worker"), "worker.1");
        assert_eq!(sink.claim_name("worker"), "worker.2");
        assert_eq!(sink.claim_name("other"), "other");
        // Suffixed names collide too
        assert_eq!(sink.claim_name("worker.1"), "worker.1.1");
    }

    #[test]
    fn test_write_parts_prefixes_timestamp() {
        let output = SharedBuf::default();
        let sink = LogSink::new(output.clone());
        sink.write_parts(b" [a] ", b"hello\n").unwrap();

        let line = raw(&output);
        assert!(line.ends_with(" [a] hello\n"));
        let timestamp = &line[..19];
        assert_eq!(timestamp.as_bytes()[4], b'-');
        assert_eq!(timestamp.as_bytes()[7], b'-');
        assert_eq!(timestamp.as_bytes()[10], b'_');
        assert_eq!(
            timestamp.chars().filter(|c| c.is_ascii_digit()).count(),
            14
        );
    }

    #[tokio::test]
    async fn test_listen_accepts_and_labels_connections() {
        let output = SharedBuf::default();
        let sink = Arc::new(LogSink::new(output.clone()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(Arc::clone(&sink).listen(listener));

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(b"alpha\nfirst\n").await.unwrap();
        conn.shutdown().await.unwrap();
        drop(conn);

        // The handler finishes on its own schedule
        for _ in 0..200 {
            if raw(&output).contains("DISCONNECTED") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let all = raw(&output);
        assert!(all.contains(" * alpha ("));
        assert!(all.contains("] first\n"));
        assert!(all.contains("] DISCONNECTED\n"));
    }
}
