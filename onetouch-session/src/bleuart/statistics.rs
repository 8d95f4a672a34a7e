//! Fragment link statistics collection

/// Fragment link statistics
///
/// Tracks traffic and protocol violations on the fragmentation layer for
/// monitoring and debugging. Updated by the link during operation; query at
/// any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStatistics {
    /// Data fragments sent (FIRST and CONTINUATION)
    pub fragments_sent: u64,
    /// Data fragments accepted
    pub fragments_received: u64,
    /// ACKs sent for accepted fragments
    pub acks_sent: u64,
    /// ACKs accepted for our own fragments
    pub acks_received: u64,
    /// Buffers whose last fragment was acknowledged
    pub buffers_sent: u64,
    /// Buffers fully reassembled and delivered
    pub buffers_received: u64,
    /// Header or count mismatches
    pub protocol_violations: u64,
    /// Exchanges abandoned by reset()
    pub resets: u64,
}

impl LinkStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Percentage of inbound chunks that violated the protocol
    ///
    /// Returns 0.0 if nothing has been received.
    pub fn error_rate(&self) -> f64 {
        let inbound = self.fragments_received + self.acks_received + self.protocol_violations;
        if inbound == 0 {
            0.0
        } else {
            (self.protocol_violations as f64 / inbound as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_rate() {
        let mut stats = LinkStatistics::new();
        assert_eq!(stats.error_rate(), 0.0);
        stats.fragments_received = 3;
        stats.protocol_violations = 1;
        assert_eq!(stats.error_rate(), 25.0);
        stats.clear();
        assert_eq!(stats, LinkStatistics::default());
    }
}
