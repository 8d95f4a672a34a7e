//! Fragment header encoding
//!
//! One byte: the high nibble selects the fragment kind, the low nibble carries
//! the remaining-fragment count for the current direction of the exchange.

use onetouch_core::{OneTouchError, OneTouchResult};
use std::fmt;

/// Size of the fragment header in bytes
pub const HEADER_SIZE: usize = 1;

/// Largest count the 4-bit field can carry
pub const MAX_FRAGMENTS: usize = 0x0F;

const KIND_MASK: u8 = 0xF0;
const COUNT_MASK: u8 = 0x0F;

/// Fragment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// First fragment of a buffer, count = total fragments
    First,
    /// Any later fragment, count = fragments remaining including this one
    Continuation,
    /// Single-byte acknowledgement echoing the received count
    Ack,
}

impl FragmentKind {
    /// High nibble value for this kind
    pub fn to_nibble(self) -> u8 {
        match self {
            FragmentKind::First => 0x00,
            FragmentKind::Continuation => 0x40,
            FragmentKind::Ack => 0x80,
        }
    }

    /// Kind selected by the high nibble of a header byte
    pub fn from_header_byte(header: u8) -> Option<Self> {
        match header & KIND_MASK {
            0x00 => Some(FragmentKind::First),
            0x40 => Some(FragmentKind::Continuation),
            0x80 => Some(FragmentKind::Ack),
            _ => None,
        }
    }
}

/// Decoded fragment header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub kind: FragmentKind,
    pub count: u8,
}

impl FragmentHeader {
    /// Create a header; the count is masked to 4 bits
    pub fn new(kind: FragmentKind, count: u8) -> Self {
        Self {
            kind,
            count: count & COUNT_MASK,
        }
    }

    /// Parse a header byte
    ///
    /// # Errors
    /// Returns `FragmentProtocolViolation` for an unknown high nibble
    pub fn parse(header: u8) -> OneTouchResult<Self> {
        let kind = FragmentKind::from_header_byte(header).ok_or_else(|| {
            OneTouchError::FragmentProtocolViolation(format!(
                "Unknown fragment header 0x{:02X}",
                header
            ))
        })?;
        Ok(Self {
            kind,
            count: header & COUNT_MASK,
        })
    }

    pub fn to_byte(&self) -> u8 {
        self.kind.to_nibble() | (self.count & COUNT_MASK)
    }
}

impl fmt::Display for FragmentHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes() {
        assert_eq!(FragmentHeader::new(FragmentKind::First, 3).to_byte(), 0x03);
        assert_eq!(FragmentHeader::new(FragmentKind::Continuation, 2).to_byte(), 0x42);
        assert_eq!(FragmentHeader::new(FragmentKind::Ack, 1).to_byte(), 0x81);
    }

    #[test]
    fn test_parse() {
        let header = FragmentHeader::parse(0x4F).unwrap();
        assert_eq!(header.kind, FragmentKind::Continuation);
        assert_eq!(header.count, 15);
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert!(matches!(
            FragmentHeader::parse(0xC1),
            Err(OneTouchError::FragmentProtocolViolation(_))
        ));
    }

    #[test]
    fn test_count_is_masked() {
        assert_eq!(FragmentHeader::new(FragmentKind::Ack, 0x13).count, 0x03);
    }
}
