//! Raw send capability supplied by the transport collaborator

use bytes::Bytes;
use std::fmt::Write as _;
use tokio::sync::mpsc;

/// Outbound side of the byte pipe
///
/// Called once per fragment or ACK, never with a reassembled buffer. Sends are
/// fire-and-forget: the answer, if any, arrives later as an inbound chunk.
#[cfg_attr(test, mockall::automock)]
pub trait TransportSink {
    fn send_raw(&mut self, bytes: &[u8]);
}

impl<T: TransportSink + ?Sized> TransportSink for &mut T {
    fn send_raw(&mut self, bytes: &[u8]) {
        (**self).send_raw(bytes)
    }
}

impl<T: TransportSink + ?Sized> TransportSink for Box<T> {
    fn send_raw(&mut self, bytes: &[u8]) {
        (**self).send_raw(bytes)
    }
}

/// Sink that keeps every chunk in send order
///
/// Used by the meter simulator and by tests that bounce chunks between two
/// endpoints.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    chunks: Vec<Vec<u8>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunks sent so far
    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    /// Remove and return every recorded chunk
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.chunks)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl TransportSink for RecordingSink {
    fn send_raw(&mut self, bytes: &[u8]) {
        self.chunks.push(bytes.to_vec());
    }
}

/// Sink that forwards chunks to an async writer task
///
/// The receiving end belongs to whatever owns the radio link. A closed
/// receiver drops the chunk with a warning; the session watchdog takes care of
/// the request that will never be answered.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiver the writer task drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl TransportSink for ChannelSink {
    fn send_raw(&mut self, bytes: &[u8]) {
        log::trace!("TX {}", hex(bytes));
        if self.tx.send(Bytes::copy_from_slice(bytes)).is_err() {
            log::warn!("Outbound channel closed, dropping {} bytes", bytes.len());
        }
    }
}

/// Format bytes as space separated upper-case hex
pub fn hex(bytes: &[u8]) -> String {
    let mut line = String::with_capacity(bytes.len() * 3);
    for (idx, byte) in bytes.iter().enumerate() {
        if idx > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{:02X}", byte);
    }
    line
}
