//! Core types and utilities for the OneTouch glucometer protocol
//!
//! This crate provides the error taxonomy, the measurement record and the
//! device clock conversion shared by every layer of the stack.

pub mod device_time;
pub mod error;
pub mod measurement;

pub use device_time::{Clock, FixedClock, SystemClock, DEVICE_TIME_OFFSET};
pub use error::{OneTouchError, OneTouchResult};
pub use measurement::Measurement;
