//! Packet framing module

pub mod crc;
pub mod frame;

pub use crc::{crc16, Crc16};
pub use frame::{
    decode, decode_request, decode_response, encode, encode_request, encode_response, Direction,
    BEGIN_MARKER_A, BEGIN_MARKER_B, END_MARKER, START_MARKER,
};
