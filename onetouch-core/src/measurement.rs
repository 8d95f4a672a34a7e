//! Glucose measurement record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single stored glucose reading retrieved from the meter
///
/// Created by the session state machine when it parses a measurement-shaped
/// response. `value` is in device units; no unit conversion is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Reading in device units
    pub value: f32,
    /// Absolute time of the reading (device epoch already applied)
    pub timestamp: DateTime<Utc>,
    /// Decimal form of the device record id
    pub record_id: String,
    /// Device error code, 0 means no error
    pub error_code: u16,
}

impl Measurement {
    /// Create a measurement without an error code
    pub fn new(value: f32, timestamp: DateTime<Utc>, record_id: u16) -> Self {
        Self::with_error(value, timestamp, record_id, 0)
    }

    /// Create a measurement carrying a device error code
    pub fn with_error(
        value: f32,
        timestamp: DateTime<Utc>,
        record_id: u16,
        error_code: u16,
    ) -> Self {
        Self {
            value,
            timestamp,
            record_id: record_id.to_string(),
            error_code,
        }
    }

    /// Check whether the device flagged this reading
    pub fn has_error(&self) -> bool {
        self.error_code != 0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} @ {} error={}",
            self.record_id, self.value, self.timestamp, self.error_code
        )
    }
}
