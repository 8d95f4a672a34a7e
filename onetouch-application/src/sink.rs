//! Upward interface to the embedding application

use crate::command::LimitKind;
use chrono::{DateTime, Utc};
use onetouch_core::{Measurement, OneTouchError};

/// Receiver of session results
///
/// All callbacks run on the caller's thread from inside a session operation.
/// They must not call back into the session.
#[cfg_attr(test, mockall::automock)]
pub trait ApplicationSink {
    /// A completed batch of measurements, never empty
    fn measurements_received(&mut self, measurements: Vec<Measurement>);

    /// A recoverable error detected by any layer
    fn protocol_error(&mut self, error: &OneTouchError);

    /// The meter reported its clock, before the session overwrites it
    fn device_time_read(&mut self, _device_time: DateTime<Utc>) {}

    /// A limit was read, or a write was acknowledged
    fn limit_updated(&mut self, _kind: LimitKind, _value: u16) {}
}

impl<A: ApplicationSink + ?Sized> ApplicationSink for &mut A {
    fn measurements_received(&mut self, measurements: Vec<Measurement>) {
        (**self).measurements_received(measurements)
    }

    fn protocol_error(&mut self, error: &OneTouchError) {
        (**self).protocol_error(error)
    }

    fn device_time_read(&mut self, device_time: DateTime<Utc>) {
        (**self).device_time_read(device_time)
    }

    fn limit_updated(&mut self, kind: LimitKind, value: u16) {
        (**self).limit_updated(kind, value)
    }
}

impl<A: ApplicationSink + ?Sized> ApplicationSink for Box<A> {
    fn measurements_received(&mut self, measurements: Vec<Measurement>) {
        (**self).measurements_received(measurements)
    }

    fn protocol_error(&mut self, error: &OneTouchError) {
        (**self).protocol_error(error)
    }

    fn device_time_read(&mut self, device_time: DateTime<Utc>) {
        (**self).device_time_read(device_time)
    }

    fn limit_updated(&mut self, kind: LimitKind, value: u16) {
        (**self).limit_updated(kind, value)
    }
}

/// Application sink that keeps everything it is given
#[derive(Debug, Clone, Default)]
pub struct RecordingApplication {
    pub batches: Vec<Vec<Measurement>>,
    pub errors: Vec<OneTouchError>,
    pub device_times: Vec<DateTime<Utc>>,
    pub limits: Vec<(LimitKind, u16)>,
}

impl RecordingApplication {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every measurement received, in delivery order
    pub fn measurements(&self) -> Vec<Measurement> {
        self.batches.iter().flatten().cloned().collect()
    }
}

impl ApplicationSink for RecordingApplication {
    fn measurements_received(&mut self, measurements: Vec<Measurement>) {
        self.batches.push(measurements);
    }

    fn protocol_error(&mut self, error: &OneTouchError) {
        self.errors.push(error.clone());
    }

    fn device_time_read(&mut self, device_time: DateTime<Utc>) {
        self.device_times.push(device_time);
    }

    fn limit_updated(&mut self, kind: LimitKind, value: u16) {
        self.limits.push((kind, value));
    }
}
