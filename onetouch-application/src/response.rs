//! Meter responses
//!
//! The meter answers with a bare payload and no opcode, so the meaning of a
//! response depends entirely on what the session asked for. Parsing therefore
//! takes the current state together with the payload; a byte count that fits
//! no shape for that state is rejected.

use crate::state::{LimitOp, RecordAddress, SessionState};
use bytes::Buf;
use onetouch_core::{OneTouchError, OneTouchResult};

/// Record returned by an index query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedRecord {
    pub index: u16,
    pub id: u16,
    /// Seconds since the device epoch
    pub device_time: u32,
    pub value: i16,
}

/// Record returned by an id query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFields {
    /// Seconds since the device epoch
    pub device_time: u32,
    pub value: i16,
    pub error_code: u16,
}

/// Decoded meter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Current device clock, seconds since the device epoch
    DeviceTime(u32),
    TimeSetAck,
    RecordCount(u16),
    HighestId(u16),
    IndexedRecord(IndexedRecord),
    Record(RecordFields),
    RecordNotFound,
    LimitValue(u16),
    LimitAck,
}

pub const DEVICE_TIME_LEN: usize = 4;
pub const RECORD_COUNT_LEN: usize = 2;
pub const HIGHEST_ID_LEN: usize = 4;
pub const INDEXED_RECORD_LEN: usize = 16;
pub const ID_RECORD_LEN: usize = 11;
pub const LIMIT_VALUE_LEN: usize = 4;

impl Response {
    /// Interpret a payload received in `state`
    ///
    /// # Errors
    /// Returns `UnexpectedPayloadShape` if the length is not valid for the
    /// state, including any payload received while idle.
    pub fn parse(state: &SessionState, payload: &[u8]) -> OneTouchResult<Self> {
        let mut buf = payload;
        let response = match (state, payload.len()) {
            (SessionState::WaitingTime, DEVICE_TIME_LEN) => Response::DeviceTime(buf.get_u32_le()),
            (SessionState::WaitingTime, 0) => Response::TimeSetAck,
            (SessionState::WaitingOldestIndex, RECORD_COUNT_LEN) => {
                Response::RecordCount(buf.get_u16_le())
            }
            // 32-bit field, ids only use the low half
            (SessionState::WaitingHighestId, HIGHEST_ID_LEN) => {
                Response::HighestId(buf.get_u16_le())
            }
            (
                SessionState::WaitingMeasurement {
                    address: RecordAddress::Index(_),
                },
                INDEXED_RECORD_LEN,
            ) => {
                let index = buf.get_u16_le();
                buf.advance(1);
                let id = buf.get_u16_le();
                let device_time = buf.get_u32_le();
                let value = buf.get_i16_le();
                Response::IndexedRecord(IndexedRecord {
                    index,
                    id,
                    device_time,
                    value,
                })
            }
            (
                SessionState::WaitingMeasurement {
                    address: RecordAddress::Id(_),
                },
                ID_RECORD_LEN,
            ) => {
                let device_time = buf.get_u32_le();
                let value = buf.get_i16_le();
                buf.advance(3);
                let error_code = buf.get_u16_le();
                Response::Record(RecordFields {
                    device_time,
                    value,
                    error_code,
                })
            }
            (
                SessionState::WaitingMeasurement {
                    address: RecordAddress::Id(_),
                },
                0,
            ) => Response::RecordNotFound,
            (
                SessionState::WaitingLimit {
                    op: LimitOp::Read, ..
                },
                LIMIT_VALUE_LEN,
            ) => Response::LimitValue(buf.get_u16_le()),
            (
                SessionState::WaitingLimit {
                    op: LimitOp::Write(_),
                    ..
                },
                0,
            ) => Response::LimitAck,
            (state, length) => {
                return Err(OneTouchError::UnexpectedPayloadShape {
                    state: state.to_string(),
                    length,
                });
            }
        };
        Ok(response)
    }
}
