//! Application layer module for the OneTouch protocol
//!
//! This crate drives meter synchronization on top of the session layer:
//! clock set, full record enumeration by index, and incremental polling by
//! record id.

pub mod command;
pub mod config;
pub mod response;
pub mod session;
pub mod sink;
pub mod state;
pub mod statistics;
pub mod watchdog;

pub use command::{Command, LimitKind};
pub use config::SessionConfig;
pub use onetouch_core::{OneTouchError, OneTouchResult};
pub use response::{IndexedRecord, RecordFields, Response};
pub use session::MeterSession;
pub use sink::{ApplicationSink, RecordingApplication};
pub use state::{LimitOp, RecordAddress, SessionState, SyncState};
pub use statistics::SessionStatistics;
pub use watchdog::ResponseWatchdog;
