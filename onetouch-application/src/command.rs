//! Meter commands
//!
//! Each command is a short opcode sequence followed by little-endian
//! arguments. The session frames it with the packet codec and hands it to the
//! fragment link.

use crate::state::{LimitOp, RecordAddress, SessionState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter selector shared by the highest-id and limit commands
const PARAMETER_READ: [u8; 2] = [0x0A, 0x02];
const PARAMETER_WRITE: [u8; 2] = [0x0A, 0x01];
const PARAMETER_HIGHEST_ID: u8 = 0x06;

/// Glucose alarm limit stored on the meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    Low,
    High,
}

impl LimitKind {
    fn parameter(&self) -> u8 {
        match self {
            LimitKind::Low => 0x09,
            LimitKind::High => 0x0A,
        }
    }
}

/// Command sent from the host to the meter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetTime,
    /// Set the device clock, argument in device-epoch seconds
    SetTime(u32),
    GetHighestId,
    GetOldestIndex,
    GetMeasurementByIndex(u16),
    GetMeasurementById(u16),
    ReadLimit(LimitKind),
    WriteLimit(LimitKind, u16),
}

impl Command {
    /// Encode the command payload (without framing)
    pub fn payload(&self) -> Vec<u8> {
        match *self {
            Command::GetTime => vec![0x20, 0x02],
            Command::SetTime(seconds) => {
                let mut payload = vec![0x20, 0x01];
                payload.extend_from_slice(&seconds.to_le_bytes());
                payload
            }
            Command::GetHighestId => {
                let mut payload = PARAMETER_READ.to_vec();
                payload.push(PARAMETER_HIGHEST_ID);
                payload
            }
            Command::GetOldestIndex => vec![0x27, 0x00],
            Command::GetMeasurementByIndex(index) => {
                let [lo, hi] = index.to_le_bytes();
                vec![0x31, 0x02, lo, hi, 0x00]
            }
            Command::GetMeasurementById(id) => {
                let [lo, hi] = id.to_le_bytes();
                vec![0xB3, lo, hi]
            }
            Command::ReadLimit(kind) => {
                let mut payload = PARAMETER_READ.to_vec();
                payload.push(kind.parameter());
                payload
            }
            Command::WriteLimit(kind, value) => {
                let [lo, hi] = value.to_le_bytes();
                let mut payload = PARAMETER_WRITE.to_vec();
                payload.extend_from_slice(&[kind.parameter(), lo, hi, 0x00, 0x00]);
                payload
            }
        }
    }

    /// State the session waits in once this command is out
    pub fn awaiting(&self) -> SessionState {
        match *self {
            Command::GetTime | Command::SetTime(_) => SessionState::WaitingTime,
            Command::GetHighestId => SessionState::WaitingHighestId,
            Command::GetOldestIndex => SessionState::WaitingOldestIndex,
            Command::GetMeasurementByIndex(index) => SessionState::WaitingMeasurement {
                address: RecordAddress::Index(index),
            },
            Command::GetMeasurementById(id) => SessionState::WaitingMeasurement {
                address: RecordAddress::Id(id),
            },
            Command::ReadLimit(kind) => SessionState::WaitingLimit {
                kind,
                op: LimitOp::Read,
            },
            Command::WriteLimit(kind, value) => SessionState::WaitingLimit {
                kind,
                op: LimitOp::Write(value),
            },
        }
    }

    /// Decode a command payload, as the meter side sees it
    ///
    /// Returns `None` for payloads that match no known command.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            [0x20, 0x02] => Some(Command::GetTime),
            [0x20, 0x01, a, b, c, d] => Some(Command::SetTime(u32::from_le_bytes([*a, *b, *c, *d]))),
            [0x0A, 0x02, PARAMETER_HIGHEST_ID] => Some(Command::GetHighestId),
            [0x0A, 0x02, 0x09] => Some(Command::ReadLimit(LimitKind::Low)),
            [0x0A, 0x02, 0x0A] => Some(Command::ReadLimit(LimitKind::High)),
            [0x0A, 0x01, 0x09, lo, hi, 0x00, 0x00] => {
                Some(Command::WriteLimit(LimitKind::Low, u16::from_le_bytes([*lo, *hi])))
            }
            [0x0A, 0x01, 0x0A, lo, hi, 0x00, 0x00] => {
                Some(Command::WriteLimit(LimitKind::High, u16::from_le_bytes([*lo, *hi])))
            }
            [0x27, 0x00] => Some(Command::GetOldestIndex),
            [0x31, 0x02, lo, hi, 0x00] => {
                Some(Command::GetMeasurementByIndex(u16::from_le_bytes([*lo, *hi])))
            }
            [0xB3, lo, hi] => Some(Command::GetMeasurementById(u16::from_le_bytes([*lo, *hi]))),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GetTime => write!(f, "GetTime"),
            Command::SetTime(seconds) => write!(f, "SetTime({})", seconds),
            Command::GetHighestId => write!(f, "GetHighestId"),
            Command::GetOldestIndex => write!(f, "GetOldestIndex"),
            Command::GetMeasurementByIndex(index) => write!(f, "GetMeasurementByIndex({})", index),
            Command::GetMeasurementById(id) => write!(f, "GetMeasurementById({})", id),
            Command::ReadLimit(kind) => write!(f, "ReadLimit({:?})", kind),
            Command::WriteLimit(kind, value) => write!(f, "WriteLimit({:?}, {})", kind, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes() {
        assert_eq!(Command::GetTime.payload(), vec![0x20, 0x02]);
        assert_eq!(
            Command::SetTime(0x1234_5678).payload(),
            vec![0x20, 0x01, 0x78, 0x56, 0x34, 0x12]
        );
        assert_eq!(Command::GetHighestId.payload(), vec![0x0A, 0x02, 0x06]);
        assert_eq!(Command::GetOldestIndex.payload(), vec![0x27, 0x00]);
        assert_eq!(
            Command::GetMeasurementByIndex(0x0102).payload(),
            vec![0x31, 0x02, 0x02, 0x01, 0x00]
        );
        assert_eq!(Command::GetMeasurementById(0x0304).payload(), vec![0xB3, 0x04, 0x03]);
    }

    #[test]
    fn test_limit_opcodes() {
        assert_eq!(Command::ReadLimit(LimitKind::Low).payload(), vec![0x0A, 0x02, 0x09]);
        assert_eq!(Command::ReadLimit(LimitKind::High).payload(), vec![0x0A, 0x02, 0x0A]);
        assert_eq!(
            Command::WriteLimit(LimitKind::High, 180).payload(),
            vec![0x0A, 0x01, 0x0A, 180, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_parse_inverts_payload() {
        let commands = [
            Command::GetTime,
            Command::SetTime(777),
            Command::GetHighestId,
            Command::GetOldestIndex,
            Command::GetMeasurementByIndex(41),
            Command::GetMeasurementById(512),
            Command::ReadLimit(LimitKind::Low),
            Command::WriteLimit(LimitKind::Low, 70),
        ];
        for command in commands {
            assert_eq!(Command::parse(&command.payload()), Some(command));
        }
        assert_eq!(Command::parse(&[0xFF]), None);
    }

    #[test]
    fn test_awaiting_state() {
        assert_eq!(Command::SetTime(1).awaiting(), SessionState::WaitingTime);
        assert_eq!(
            Command::GetMeasurementById(6).awaiting(),
            SessionState::WaitingMeasurement {
                address: RecordAddress::Id(6)
            }
        );
    }
}
