use std::time::Duration;
use thiserror::Error;

/// Main error type for OneTouch protocol operations
///
/// Every layer of the stack reports through this one enum so that the
/// application sees a single taxonomy no matter which layer detected the
/// problem. None of the variants is fatal to the process: recovery
/// (reset, reconnect) is a decision left to the integrator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OneTouchError {
    /// Frame checksum mismatch
    ///
    /// `expected` is the CRC computed over the received bytes, `actual` is the
    /// value embedded in the frame.
    #[error("Bad CRC: expected 0x{expected:04X} but frame carries 0x{actual:04X}")]
    BadCrc { expected: u16, actual: u16 },

    /// Declared frame length does not match the received byte count
    #[error("Bad length: frame declares {declared} bytes but {actual} were received")]
    BadLength { declared: usize, actual: usize },

    /// Not enough bytes to read the length and checksum fields
    #[error("Frame truncated: only {actual} bytes received")]
    Truncated { actual: usize },

    /// Response byte count does not match any shape valid for the current state
    #[error("Unexpected payload of {length} bytes while {state}")]
    UnexpectedPayloadShape { state: String, length: usize },

    /// Header or sequence-count mismatch during reassembly or ACK wait
    #[error("Fragment protocol violation: {0}")]
    FragmentProtocolViolation(String),

    /// A send or command was issued while an exchange is still in flight
    #[error("Busy: {0}")]
    Busy(String),

    /// A command was issued before the session was connected
    #[error("Session is not connected")]
    NotConnected,

    /// No valid response arrived within the configured bound
    #[error("No response while {state} after {waited:?}")]
    ResponseTimeout { state: String, waited: Duration },

    /// Buffer needs more fragments than the 4-bit count can express
    #[error("Buffer of {length} bytes exceeds the {max} bytes a single exchange can carry")]
    BufferTooLarge { length: usize, max: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The task owning the session has stopped
    #[error("Channel closed")]
    ChannelClosed,
}

impl OneTouchError {
    /// Check if the error was raised while validating a frame
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            OneTouchError::BadCrc { .. }
                | OneTouchError::BadLength { .. }
                | OneTouchError::Truncated { .. }
        )
    }
}

/// Result type alias for OneTouch operations
pub type OneTouchResult<T> = Result<T, OneTouchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_crc_message() {
        let err = OneTouchError::BadCrc {
            expected: 0x1D0F,
            actual: 0xBEEF,
        };
        assert_eq!(
            err.to_string(),
            "Bad CRC: expected 0x1D0F but frame carries 0xBEEF"
        );
        assert!(err.is_frame_error());
    }

    #[test]
    fn test_shape_error_is_not_frame_error() {
        let err = OneTouchError::UnexpectedPayloadShape {
            state: "WaitingTime".to_string(),
            length: 3,
        };
        assert!(!err.is_frame_error());
        assert!(err.to_string().contains("3 bytes"));
    }
}
