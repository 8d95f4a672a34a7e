//! Session layer module for the OneTouch protocol
//!
//! This crate turns the raw byte pipe into reliable framed exchanges:
//!
//! - `packet`: checksummed frame codec (start marker, length, payload markers, CRC16)
//! - `bleuart`: stop-and-wait fragmentation with per-fragment acknowledgement
//!
//! Both layers are strictly half-duplex. A frame is handed to the fragment
//! link only while it is idle, and a reassembled buffer is delivered only
//! after the link has returned to idle.

pub mod bleuart;
pub mod packet;

pub use onetouch_core::{OneTouchError, OneTouchResult};
pub use bleuart::{FragmentHeader, FragmentKind, FragmentLink, LinkParameters, LinkState, LinkStatistics};
pub use packet::{Crc16, Direction};
