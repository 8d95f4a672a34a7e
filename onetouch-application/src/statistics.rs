//! Session statistics collection

/// Session statistics
///
/// Counts frames and errors seen above the fragment link. Link-level counters
/// live in `LinkStatistics`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub crc_errors: u64,
    /// Bad declared length or truncated frame
    pub length_errors: u64,
    /// Responses whose size fits nothing expected in the current state
    pub shape_errors: u64,
    pub fragment_violations: u64,
    pub timeouts: u64,
    pub batches_delivered: u64,
    pub measurements_delivered: u64,
}

impl SessionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Percentage of received frames that were rejected
    pub fn frame_error_rate(&self) -> f64 {
        if self.frames_received == 0 {
            0.0
        } else {
            let rejected = self.crc_errors + self.length_errors + self.shape_errors;
            (rejected as f64 / self.frames_received as f64) * 100.0
        }
    }
}
