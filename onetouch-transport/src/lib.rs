//! Transport boundary for the OneTouch protocol stack
//!
//! Connection management, MTU negotiation and notification subscription are
//! the transport collaborator's business. This crate only defines how the core
//! hands it bytes: one MTU-sized chunk per call, fire-and-forget.

pub mod sink;

pub use onetouch_core::{OneTouchError, OneTouchResult};
pub use sink::{hex, ChannelSink, RecordingSink, TransportSink};
