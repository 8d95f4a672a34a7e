//! Simulated OneTouch meter
//!
//! This crate provides the device side of the protocol: it reassembles host
//! requests, answers them from an in-memory record store and fragments the
//! responses back. Hosts can be exercised end to end without hardware.

pub mod meter;
pub mod store;

pub use meter::{MeterConfig, SimulatedMeter};
pub use store::{RecordStore, StoredRecord};
