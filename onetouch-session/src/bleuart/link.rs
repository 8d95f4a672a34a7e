//! Stop-and-wait fragment link
//!
//! Splits an outgoing buffer into MTU-sized fragments and reassembles inbound
//! fragments into one buffer. Every inbound data fragment is acknowledged
//! immediately; every outbound fragment waits for its ACK before the next one
//! goes out.
//!
//! The link never calls back into the layer above. Completed inbound buffers
//! are returned from [`FragmentLink::on_bytes_received`], by which time the
//! link is already idle again and ready for the next send.

use crate::bleuart::header::{FragmentHeader, FragmentKind, HEADER_SIZE, MAX_FRAGMENTS};
use crate::bleuart::state::LinkState;
use crate::bleuart::statistics::LinkStatistics;
use bytes::{Bytes, BytesMut};
use onetouch_core::{OneTouchError, OneTouchResult};
use onetouch_transport::{hex, TransportSink};
use serde::{Deserialize, Serialize};

/// Fragment link parameters
///
/// # MTU
/// `mtu` is the negotiated number of bytes one chunk of the pipe can carry.
/// One byte of every fragment is the header, so each fragment carries at most
/// `mtu - 1` payload bytes. The default of 20 is the payload of a default
/// 23-byte ATT MTU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkParameters {
    pub mtu: usize,
}

impl LinkParameters {
    pub fn new(mtu: usize) -> Self {
        Self { mtu }
    }

    /// Payload bytes per fragment
    pub fn max_fragment_payload(&self) -> usize {
        self.mtu.saturating_sub(HEADER_SIZE)
    }

    /// Largest buffer a single exchange can carry
    pub fn max_buffer_len(&self) -> usize {
        MAX_FRAGMENTS * self.max_fragment_payload()
    }

    /// Validate parameters
    ///
    /// # Errors
    /// Returns `InvalidData` if the MTU leaves no room for payload
    pub fn validate(&self) -> OneTouchResult<()> {
        if self.mtu <= HEADER_SIZE {
            return Err(OneTouchError::InvalidData(format!(
                "MTU must be at least {} bytes, got {}",
                HEADER_SIZE + 1,
                self.mtu
            )));
        }
        Ok(())
    }
}

impl Default for LinkParameters {
    fn default() -> Self {
        Self { mtu: 20 }
    }
}

/// Half-duplex fragment link
#[derive(Debug)]
pub struct FragmentLink {
    parameters: LinkParameters,
    state: LinkState,
    /// Fragments (or ACKs) still expected in the current exchange
    remaining: u8,
    /// Unsent part of the outbound buffer
    tx_data: Bytes,
    /// Inbound buffer under reassembly
    rx_data: BytesMut,
    statistics: LinkStatistics,
}

impl FragmentLink {
    /// Create a new idle link
    ///
    /// # Errors
    /// Returns `InvalidData` if the parameters are invalid
    pub fn new(parameters: LinkParameters) -> OneTouchResult<Self> {
        parameters.validate()?;
        Ok(Self {
            parameters,
            state: LinkState::Idle,
            remaining: 0,
            tx_data: Bytes::new(),
            rx_data: BytesMut::new(),
            statistics: LinkStatistics::new(),
        })
    }

    /// Start sending a buffer
    ///
    /// Sends the FIRST fragment right away; later fragments go out as ACKs
    /// arrive through [`FragmentLink::on_bytes_received`]. An empty buffer is
    /// carried by a single header-only fragment.
    ///
    /// # Errors
    /// - `Busy` if an exchange is already in flight
    /// - `BufferTooLarge` if the buffer needs more than 15 fragments
    pub fn send<S: TransportSink + ?Sized>(
        &mut self,
        buffer: &[u8],
        sink: &mut S,
    ) -> OneTouchResult<()> {
        if !self.state.is_idle() {
            return Err(OneTouchError::Busy(format!(
                "fragment link is {}",
                self.state
            )));
        }

        let max_payload = self.parameters.max_fragment_payload();
        let fragment_count = buffer.len().div_ceil(max_payload).max(1);
        if fragment_count > MAX_FRAGMENTS {
            return Err(OneTouchError::BufferTooLarge {
                length: buffer.len(),
                max: self.parameters.max_buffer_len(),
            });
        }

        log::debug!(
            "Sending {} bytes in {} fragment(s)",
            buffer.len(),
            fragment_count
        );
        self.state = LinkState::Sending;
        self.remaining = fragment_count as u8;
        self.tx_data = Bytes::copy_from_slice(buffer);
        self.send_fragment(FragmentKind::First, sink);
        Ok(())
    }

    /// Handle one inbound chunk from the pipe
    ///
    /// # Returns
    /// * `Ok(Some(buffer))` - the chunk completed an inbound buffer
    /// * `Ok(None)` - the chunk was accepted, exchange still in progress
    /// * `Err(FragmentProtocolViolation)` - the chunk did not fit the current
    ///   exchange; the link state is left untouched
    pub fn on_bytes_received<S: TransportSink + ?Sized>(
        &mut self,
        bytes: &[u8],
        sink: &mut S,
    ) -> OneTouchResult<Option<Bytes>> {
        log::trace!("RX [{}] {}", self.state, hex(bytes));
        let result = self.dispatch(bytes, sink);
        if let Err(e) = &result {
            self.statistics.protocol_violations += 1;
            log::error!("{} (link {})", e, self.state);
        }
        result
    }

    /// Abandon any exchange in flight and return to idle
    ///
    /// Half-built buffers in either direction are discarded without being
    /// delivered.
    pub fn reset(&mut self) {
        if !self.state.is_idle() {
            log::debug!(
                "Resetting link in {} with {} fragment(s) outstanding",
                self.state,
                self.remaining
            );
            self.statistics.resets += 1;
        }
        self.state = LinkState::Idle;
        self.remaining = 0;
        self.tx_data = Bytes::new();
        self.rx_data.clear();
    }

    fn dispatch<S: TransportSink + ?Sized>(
        &mut self,
        bytes: &[u8],
        sink: &mut S,
    ) -> OneTouchResult<Option<Bytes>> {
        let Some(&first) = bytes.first() else {
            return Err(violation("empty chunk".to_string()));
        };
        let header = FragmentHeader::parse(first)?;
        let payload = &bytes[HEADER_SIZE..];

        match self.state {
            LinkState::Idle => {
                if header.kind != FragmentKind::First {
                    return Err(violation(format!("expected FIRST fragment, got {}", header)));
                }
                if header.count == 0 {
                    return Err(violation("FIRST fragment announces 0 fragments".to_string()));
                }
                log::debug!("Receiving 1 of {}", header.count);
                self.rx_data.clear();
                self.remaining = header.count;
                Ok(self.accept_fragment(payload, sink))
            }
            LinkState::Receiving => {
                if header.kind != FragmentKind::Continuation || header.count != self.remaining {
                    return Err(violation(format!(
                        "expected Continuation({}), got {}",
                        self.remaining, header
                    )));
                }
                Ok(self.accept_fragment(payload, sink))
            }
            LinkState::Sending => {
                if bytes.len() != HEADER_SIZE
                    || header.kind != FragmentKind::Ack
                    || header.count != self.remaining
                {
                    return Err(violation(format!(
                        "expected Ack({}), got {} in {} byte(s)",
                        self.remaining,
                        header,
                        bytes.len()
                    )));
                }
                self.statistics.acks_received += 1;
                self.remaining -= 1;
                if self.remaining == 0 {
                    log::debug!("Send complete");
                    self.tx_data = Bytes::new();
                    self.state = LinkState::Idle;
                    self.statistics.buffers_sent += 1;
                } else {
                    self.send_fragment(FragmentKind::Continuation, sink);
                }
                Ok(None)
            }
        }
    }

    fn accept_fragment<S: TransportSink + ?Sized>(
        &mut self,
        payload: &[u8],
        sink: &mut S,
    ) -> Option<Bytes> {
        self.rx_data.extend_from_slice(payload);
        self.statistics.fragments_received += 1;

        let ack = FragmentHeader::new(FragmentKind::Ack, self.remaining).to_byte();
        sink.send_raw(&[ack]);
        self.statistics.acks_sent += 1;

        self.remaining -= 1;
        if self.remaining > 0 {
            log::trace!("{} fragment(s) remaining", self.remaining);
            self.state = LinkState::Receiving;
            None
        } else {
            log::debug!("{} bytes received", self.rx_data.len());
            self.state = LinkState::Idle;
            self.statistics.buffers_received += 1;
            Some(self.rx_data.split().freeze())
        }
    }

    fn send_fragment<S: TransportSink + ?Sized>(&mut self, kind: FragmentKind, sink: &mut S) {
        let chunk_len = self.parameters.max_fragment_payload().min(self.tx_data.len());
        let chunk = self.tx_data.split_to(chunk_len);

        let mut fragment = Vec::with_capacity(HEADER_SIZE + chunk.len());
        fragment.push(FragmentHeader::new(kind, self.remaining).to_byte());
        fragment.extend_from_slice(&chunk);
        sink.send_raw(&fragment);
        self.statistics.fragments_sent += 1;
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn parameters(&self) -> &LinkParameters {
        &self.parameters
    }

    pub fn statistics(&self) -> &LinkStatistics {
        &self.statistics
    }

    pub fn clear_statistics(&mut self) {
        self.statistics.clear();
    }
}

fn violation(message: String) -> OneTouchError {
    OneTouchError::FragmentProtocolViolation(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onetouch_transport::RecordingSink;

    /// Run one buffer from `sender` to `receiver`, bouncing every chunk
    fn transfer(sender: &mut FragmentLink, receiver: &mut FragmentLink, buffer: &[u8]) -> Bytes {
        let mut to_receiver = RecordingSink::new();
        let mut to_sender = RecordingSink::new();
        let mut delivered = None;

        sender.send(buffer, &mut to_receiver).unwrap();
        while !to_receiver.is_empty() || !to_sender.is_empty() {
            for chunk in to_receiver.drain() {
                if let Some(buf) = receiver.on_bytes_received(&chunk, &mut to_sender).unwrap() {
                    assert!(delivered.is_none(), "delivered twice");
                    delivered = Some(buf);
                }
            }
            for chunk in to_sender.drain() {
                assert!(sender.on_bytes_received(&chunk, &mut to_receiver).unwrap().is_none());
            }
        }
        delivered.expect("buffer not delivered")
    }

    #[test]
    fn test_round_trip_sizes_and_mtus() {
        for mtu in [20usize, 23, 100] {
            let params = LinkParameters::new(mtu);
            let m = params.max_fragment_payload();
            for size in [0, 1, m - 1, m, m + 1, 10 * m] {
                let mut sender = FragmentLink::new(params.clone()).unwrap();
                let mut receiver = FragmentLink::new(params.clone()).unwrap();
                let buffer: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

                let received = transfer(&mut sender, &mut receiver, &buffer);

                assert_eq!(&received[..], &buffer[..], "mtu {} size {}", mtu, size);
                assert!(sender.is_idle());
                assert!(receiver.is_idle());
            }
        }
    }

    #[test]
    fn test_wire_sequence_three_fragments() {
        let mut link = FragmentLink::new(LinkParameters::new(20)).unwrap();
        let mut sink = RecordingSink::new();
        let buffer = vec![0xAB; 45];

        link.send(&buffer, &mut sink).unwrap();
        let sent = sink.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0], 0x03);
        assert_eq!(sent[0].len(), 20);

        link.on_bytes_received(&[0x83], &mut sink).unwrap();
        let sent = sink.drain();
        assert_eq!(sent[0][0], 0x42);
        assert_eq!(sent[0].len(), 20);

        link.on_bytes_received(&[0x82], &mut sink).unwrap();
        let sent = sink.drain();
        assert_eq!(sent[0][0], 0x41);
        assert_eq!(sent[0].len(), 8);

        link.on_bytes_received(&[0x81], &mut sink).unwrap();
        assert!(sink.is_empty());
        assert!(link.is_idle());
        assert_eq!(link.statistics().buffers_sent, 1);
    }

    #[test]
    fn test_receiver_acks_every_fragment() {
        let mut link = FragmentLink::new(LinkParameters::new(4)).unwrap();
        let mut sink = RecordingSink::new();

        assert!(link.on_bytes_received(&[0x02, 1, 2, 3], &mut sink).unwrap().is_none());
        assert_eq!(link.state(), LinkState::Receiving);
        let done = link.on_bytes_received(&[0x41, 4], &mut sink).unwrap();

        assert_eq!(done.unwrap().as_ref(), &[1u8, 2, 3, 4]);
        assert_eq!(sink.chunks(), &[vec![0x82u8], vec![0x81u8]]);
        assert!(link.is_idle());
    }

    #[test]
    fn test_wrong_ack_count_does_not_advance() {
        let mut link = FragmentLink::new(LinkParameters::new(20)).unwrap();
        let mut sink = RecordingSink::new();
        link.send(&[0u8; 30], &mut sink).unwrap();
        sink.drain();

        let err = link.on_bytes_received(&[0x81], &mut sink).unwrap_err();
        assert!(matches!(err, OneTouchError::FragmentProtocolViolation(_)));
        assert!(sink.is_empty());
        assert_eq!(link.state(), LinkState::Sending);

        // The expected ACK still works afterwards
        link.on_bytes_received(&[0x82], &mut sink).unwrap();
        assert_eq!(sink.drain()[0][0], 0x41);
        assert_eq!(link.statistics().protocol_violations, 1);
    }

    #[test]
    fn test_ack_with_payload_is_rejected() {
        let mut link = FragmentLink::new(LinkParameters::new(20)).unwrap();
        let mut sink = RecordingSink::new();
        link.send(&[1, 2, 3], &mut sink).unwrap();

        assert!(link.on_bytes_received(&[0x81, 0x00], &mut sink).is_err());
        assert_eq!(link.state(), LinkState::Sending);
    }

    #[test]
    fn test_wrong_continuation_count_does_not_advance() {
        let mut link = FragmentLink::new(LinkParameters::new(4)).unwrap();
        let mut sink = RecordingSink::new();
        link.on_bytes_received(&[0x03, 1, 2, 3], &mut sink).unwrap();
        sink.drain();

        let err = link.on_bytes_received(&[0x41, 4], &mut sink).unwrap_err();
        assert!(matches!(err, OneTouchError::FragmentProtocolViolation(_)));
        assert!(sink.is_empty());
        assert_eq!(link.state(), LinkState::Receiving);

        assert!(link.on_bytes_received(&[0x42, 4], &mut sink).unwrap().is_none());
        let done = link.on_bytes_received(&[0x41, 5], &mut sink).unwrap();
        assert_eq!(done.unwrap().as_ref(), &[1u8, 2, 3, 4, 5]);
    }

    #[test]
    fn test_idle_rejects_non_first_fragment() {
        let mut link = FragmentLink::new(LinkParameters::default()).unwrap();
        let mut sink = RecordingSink::new();
        assert!(link.on_bytes_received(&[0x41, 0x00], &mut sink).is_err());
        assert!(link.on_bytes_received(&[0x00], &mut sink).is_err());
        assert!(link.on_bytes_received(&[], &mut sink).is_err());
        assert!(link.is_idle());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_send_while_busy_fails() {
        let mut link = FragmentLink::new(LinkParameters::default()).unwrap();
        let mut sink = RecordingSink::new();
        link.send(&[1], &mut sink).unwrap();
        assert!(matches!(
            link.send(&[2], &mut sink),
            Err(OneTouchError::Busy(_))
        ));
        assert_eq!(sink.chunks().len(), 1);
    }

    #[test]
    fn test_buffer_too_large() {
        let params = LinkParameters::new(20);
        let mut link = FragmentLink::new(params.clone()).unwrap();
        let mut sink = RecordingSink::new();
        let buffer = vec![0u8; params.max_buffer_len() + 1];
        assert!(matches!(
            link.send(&buffer, &mut sink),
            Err(OneTouchError::BufferTooLarge { .. })
        ));
        assert!(link.is_idle());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_buffer_uses_header_only_fragment() {
        let mut link = FragmentLink::new(LinkParameters::default()).unwrap();
        let mut sink = RecordingSink::new();
        link.send(&[], &mut sink).unwrap();
        assert_eq!(sink.drain(), vec![vec![0x01u8]]);
        link.on_bytes_received(&[0x81], &mut sink).unwrap();
        assert!(link.is_idle());
    }

    #[test]
    fn test_reset_discards_partial_reassembly() {
        let mut link = FragmentLink::new(LinkParameters::new(4)).unwrap();
        let mut sink = RecordingSink::new();
        link.on_bytes_received(&[0x02, 9, 9, 9], &mut sink).unwrap();
        link.reset();
        assert!(link.is_idle());

        let done = link.on_bytes_received(&[0x01, 7], &mut sink).unwrap();
        assert_eq!(done.unwrap().as_ref(), &[7u8]);
        assert_eq!(link.statistics().resets, 1);
    }

    #[test]
    fn test_invalid_mtu() {
        assert!(FragmentLink::new(LinkParameters::new(1)).is_err());
    }
}
