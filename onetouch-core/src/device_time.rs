//! Device clock conversion
//!
//! The meter counts seconds from its own epoch (2000-01-01 minus one second).
//! Host time = offset + device seconds; device time = host time - offset.

use chrono::{DateTime, Utc};

/// Device epoch start expressed in Unix seconds
pub const DEVICE_TIME_OFFSET: i64 = 946_684_799;

/// Convert device-relative seconds to an absolute point in time
pub fn device_to_host(device_seconds: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(DEVICE_TIME_OFFSET + i64::from(device_seconds), 0)
        .unwrap_or_default()
}

/// Convert an absolute point in time to device-relative seconds
///
/// Times before the device epoch clamp to 0, times past the 32-bit range clamp
/// to `u32::MAX`.
pub fn host_to_device(time: DateTime<Utc>) -> u32 {
    let seconds = time.timestamp() - DEVICE_TIME_OFFSET;
    seconds.clamp(0, i64::from(u32::MAX)) as u32
}

/// Source of the current host time
///
/// The session reads the clock when it answers the device's time report with
/// a set-time command.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant, for deterministic sessions and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
