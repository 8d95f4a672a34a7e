//! BLE UART fragmentation module

pub mod header;
pub mod link;
pub mod state;
pub mod statistics;

pub use header::{FragmentHeader, FragmentKind, HEADER_SIZE, MAX_FRAGMENTS};
pub use link::{FragmentLink, LinkParameters};
pub use state::LinkState;
pub use statistics::LinkStatistics;
