//! Per-connection line framing and attribution
//!
//! Each forwarder connection is an unbounded, untrusted byte stream. The
//! handler cuts it into newline-delimited display lines with a hard length
//! bound, derives the stream's label from its first line, and hands every
//! line to the shared sink.

use std::sync::Arc;

use logferry_core::constants::{MAX_LINE_LEN, MAX_NAME_LEN, RECV_BUFFER_SIZE};
use logferry_core::Result;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::sink::LogSink;

/// Frames one inbound byte stream into labeled display lines
pub struct ClientHandler<S> {
    sink: Arc<LogSink>,
    stream: S,
    addr: String,
    prefix: Option<String>,
    buf: Vec<u8>,
    filled: usize,
    received_any: bool,
}

impl<S: AsyncRead + Unpin> ClientHandler<S> {
    pub fn new(sink: Arc<LogSink>, stream: S, addr: String) -> Self {
        Self {
            sink,
            stream,
            addr,
            prefix: None,
            buf: vec![0u8; RECV_BUFFER_SIZE],
            filled: 0,
            received_any: false,
        }
    }

    /// Pump the stream until the peer closes it
    ///
    /// A read error closes the stream like an EOF, with the tail and the
    /// disconnect marker still flushed, then surfaces to the accept loop.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let n = match self.stream.read(&mut self.buf[self.filled..]).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    self.finish()?;
                    return Err(e.into());
                }
            };
            self.received_any = true;
            self.consume(self.filled, self.filled + n)?;
        }
        self.finish()
    }

    /// Scan newly received bytes and emit every complete line
    ///
    /// `scan_from..end` is the fresh region; bytes before it are leftover
    /// from the last read and already known to hold no delimiter. The
    /// leftover never reaches `MAX_LINE_LEN`, so the buffer always has
    /// room for the next read.
    fn consume(&mut self, scan_from: usize, end: usize) -> Result<()> {
        let mut buf = std::mem::take(&mut self.buf);
        let mut line_start = 0;
        let mut i = scan_from;
        while i < end {
            if buf[i] == b'\n' {
                self.emit_line(&buf[line_start..=i])?;
                line_start = i + 1;
            } else if i - line_start >= MAX_LINE_LEN {
                // Force a break so one silent stream cannot pin the buffer.
                // The three bytes just emitted at the tail are overwritten
                // with a continuation marker and lead the next line.
                let saved = buf[i];
                buf[i] = b'\n';
                self.emit_line(&buf[line_start..=i])?;
                buf[i] = saved;
                line_start = i - 3;
                buf[line_start..i].copy_from_slice(b"...");
            }
            i += 1;
        }
        buf.copy_within(line_start..end, 0);
        self.filled = end - line_start;
        self.buf = buf;
        Ok(())
    }

    /// Write one newline-terminated line, assigning the label first if this
    /// is the stream's opening line
    fn emit_line(&mut self, line: &[u8]) -> Result<()> {
        if self.prefix.is_none() {
            let candidate = &line[..line.len() - 1];
            if is_valid_name(candidate) {
                let name = self.sink.claim_name(&String::from_utf8_lossy(candidate));
                self.sink.write_parts(
                    format!(" * {} ({}) CONNECTED\n", name, self.addr).as_bytes(),
                    b"",
                )?;
                self.set_label(&name);
                // The name line is metadata, not log data
                return Ok(());
            }
            let name = self.sink.claim_name(&self.addr);
            self.sink.write_parts(
                format!(" * ??? ({}) CONNECTED\n", self.addr).as_bytes(),
                b"",
            )?;
            self.set_label(&name);
        }
        if let Some(prefix) = &self.prefix {
            self.sink.write_parts(prefix.as_bytes(), line)?;
        }
        Ok(())
    }

    /// Emit the unterminated tail and the disconnect marker
    ///
    /// A connection that never sent a byte is a probe and produces nothing.
    fn finish(&mut self) -> Result<()> {
        if !self.received_any {
            return Ok(());
        }
        let prefix = match self.prefix.clone() {
            Some(prefix) => prefix,
            // The stream ended before its first newline. A partial line
            // never becomes a name; the address label is assigned quietly.
            None => {
                let name = self.sink.claim_name(&self.addr);
                self.set_label(&name)
            }
        };
        if self.filled > 0 {
            let mut tail = self.buf[..self.filled].to_vec();
            tail.push(b'\n');
            self.sink.write_parts(prefix.as_bytes(), &tail)?;
        }
        self.sink.write_parts(prefix.as_bytes(), b"DISCONNECTED\n")?;
        Ok(())
    }

    fn set_label(&mut self, name: &str) -> String {
        let prefix = format!(" [{:<width$}] ", name, width = MAX_NAME_LEN);
        self.prefix = Some(prefix.clone());
        prefix
    }
}

/// A usable stream name: 1 to 16 characters drawn from letters, digits,
/// hyphen, and underscore
fn is_valid_name(candidate: &[u8]) -> bool {
    !candidate.is_empty()
        && candidate.len() <= MAX_NAME_LEN
        && candidate
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
}
