//! Transport seam for telegram IO.
//!
//! The client only ever needs a one-way send primitive; inbound telegrams
//! arrive through [`read_telegrams`], which drives a callback on whatever
//! thread owns the stream. Reconnection and retry policies live outside
//! this crate.

use std::io::{BufRead, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Transport-level failures surfaced from the send path.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One-way telegram sink towards the simulator.
pub trait Transport: Send + Sync {
    /// Deliver one telegram. `text` is a single JSON object without the
    /// trailing newline; the transport owns the framing.
    fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Short tag for log lines.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// TcpTransport
// ---------------------------------------------------------------------------

/// Newline-framed telegram writer over TCP.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Mutex<TcpStream>,
}

impl TcpTransport {
    /// Connect to the simulator at `addr`.
    pub fn connect(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        // Control telegrams are tiny and latency-bound.
        stream.set_nodelay(true)?;
        debug!(peer = %stream.peer_addr()?, "connected to simulator");
        Ok(Self {
            stream: Mutex::new(stream),
        })
    }

    /// Clone the underlying stream for a reader thread.
    pub fn reader_stream(&self) -> std::io::Result<TcpStream> {
        self.stream
            .lock()
            .expect("transport lock poisoned")
            .try_clone()
    }
}

impl Transport for TcpTransport {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        let mut stream = self.stream.lock().expect("transport lock poisoned");
        stream.write_all(text.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

// ---------------------------------------------------------------------------
// InMemoryTransport
// ---------------------------------------------------------------------------

/// Captures sent telegrams instead of delivering them.
///
/// Lets tests and dry runs inspect exactly what would cross the wire.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<String>>,
}

impl InMemoryTransport {
    /// Empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Telegrams sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("transport lock poisoned").clone()
    }

    /// Drain the capture buffer.
    #[must_use]
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent.lock().expect("transport lock poisoned"))
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .expect("transport lock poisoned")
            .push(text.to_owned());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

// ---------------------------------------------------------------------------
// read_telegrams
// ---------------------------------------------------------------------------

/// Read newline-framed telegrams until EOF, feeding each to `on_telegram`.
///
/// Blank lines are skipped and surrounding whitespace (including a CR left
/// by CRLF framing) is trimmed. The callback returns whether reading should
/// continue; returning false stops the loop early. Returns Ok on EOF or an
/// early stop, Err only on a read failure.
pub fn read_telegrams<R: BufRead>(
    reader: R,
    mut on_telegram: impl FnMut(&str) -> bool,
) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        let telegram = line.trim();
        if telegram.is_empty() {
            continue;
        }
        trace!(len = telegram.len(), "telegram received");
        if !on_telegram(telegram) {
            return Ok(());
        }
    }
    debug!("telegram stream closed by peer");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
