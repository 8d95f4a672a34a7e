//! Packet frame encoding/decoding
//!
//! # Layout
//! ```text
//! start(0x02) | length(u16 LE, whole frame) | 0x04 | [0x06] | payload | 0x03 | crc16(u16 LE)
//! ```
//! The second begin marker (0x06) is present only on frames travelling from
//! the meter to the host. The CRC covers every byte before the CRC field.

use crate::packet::crc::{crc16, Crc16};
use onetouch_core::{OneTouchError, OneTouchResult};
use serde::{Deserialize, Serialize};

/// Start of frame
pub const START_MARKER: u8 = 0x02;
/// Marker before the payload, both directions
pub const BEGIN_MARKER_A: u8 = 0x04;
/// Extra marker before the payload on meter-to-host frames
pub const BEGIN_MARKER_B: u8 = 0x06;
/// End of payload
pub const END_MARKER: u8 = 0x03;

const LENGTH_FIELD_SIZE: usize = 2;
const CRC_SIZE: usize = 2;
/// Smallest byte count from which length and CRC can both be read
const MIN_READABLE: usize = 1 + LENGTH_FIELD_SIZE + CRC_SIZE;

/// Travel direction of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Commands sent by the host; one begin marker
    HostToDevice,
    /// Responses sent by the meter; two begin markers
    DeviceToHost,
}

impl Direction {
    /// Bytes in front of the payload
    pub fn header_len(&self) -> usize {
        match self {
            Direction::HostToDevice => 1 + LENGTH_FIELD_SIZE + 1,
            Direction::DeviceToHost => 1 + LENGTH_FIELD_SIZE + 2,
        }
    }

    /// Total framing bytes around the payload
    pub fn overhead(&self) -> usize {
        self.header_len() + 1 + CRC_SIZE
    }
}

/// Wrap a payload into a frame
///
/// # Errors
/// Returns `BufferTooLarge` if the frame length does not fit the u16 length field
pub fn encode(direction: Direction, payload: &[u8]) -> OneTouchResult<Vec<u8>> {
    let length = direction.overhead() + payload.len();
    let declared = u16::try_from(length).map_err(|_| OneTouchError::BufferTooLarge {
        length,
        max: usize::from(u16::MAX),
    })?;
    let mut frame = Vec::with_capacity(length);

    frame.push(START_MARKER);
    frame.extend_from_slice(&declared.to_le_bytes());
    frame.push(BEGIN_MARKER_A);
    if direction == Direction::DeviceToHost {
        frame.push(BEGIN_MARKER_B);
    }
    frame.extend_from_slice(payload);
    frame.push(END_MARKER);

    let mut crc = Crc16::new();
    crc.update_bytes(&frame);
    frame.extend_from_slice(&crc.value_bytes());
    Ok(frame)
}

/// Validate a frame and slice out its payload
///
/// # Error Handling
/// - `Truncated` if the frame is too short to carry length and CRC fields
/// - `BadCrc` if the embedded CRC differs from the computed one (checked first)
/// - `BadLength` if the length field differs from the byte count, or the
///   frame is shorter than the framing overhead
pub fn decode(direction: Direction, frame: &[u8]) -> OneTouchResult<Vec<u8>> {
    if frame.len() < MIN_READABLE {
        return Err(OneTouchError::Truncated {
            actual: frame.len(),
        });
    }

    let crc_pos = frame.len() - CRC_SIZE;
    let computed = crc16(&frame[..crc_pos]);
    let embedded = u16::from_le_bytes([frame[crc_pos], frame[crc_pos + 1]]);
    if computed != embedded {
        return Err(OneTouchError::BadCrc {
            expected: computed,
            actual: embedded,
        });
    }

    let declared = usize::from(u16::from_le_bytes([frame[1], frame[2]]));
    if declared != frame.len() || frame.len() < direction.overhead() {
        return Err(OneTouchError::BadLength {
            declared,
            actual: frame.len(),
        });
    }

    let begin = direction.header_len();
    let end = begin + frame.len() - direction.overhead();
    Ok(frame[begin..end].to_vec())
}

/// Frame a host command
pub fn encode_request(payload: &[u8]) -> OneTouchResult<Vec<u8>> {
    encode(Direction::HostToDevice, payload)
}

/// Unwrap a meter response
pub fn decode_response(frame: &[u8]) -> OneTouchResult<Vec<u8>> {
    decode(Direction::DeviceToHost, frame)
}

/// Frame a meter response
pub fn encode_response(payload: &[u8]) -> OneTouchResult<Vec<u8>> {
    encode(Direction::DeviceToHost, payload)
}

/// Unwrap a host command
pub fn decode_request(frame: &[u8]) -> OneTouchResult<Vec<u8>> {
    decode(Direction::HostToDevice, frame)
}
