//! Events published by the client task

use chrono::{DateTime, Utc};
use onetouch_application::{ApplicationSink, LimitKind};
use onetouch_core::{Measurement, OneTouchError};
use tokio::sync::mpsc;

/// Something the session reported
#[derive(Debug, Clone, PartialEq)]
pub enum MeterEvent {
    /// A completed batch, never empty
    Measurements(Vec<Measurement>),
    /// Meter clock as read during the handshake
    DeviceTime(DateTime<Utc>),
    Limit { kind: LimitKind, value: u16 },
    Error(OneTouchError),
}

impl MeterEvent {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, MeterEvent::Error(_))
    }

    /// Measurements carried by the event, empty for other kinds
    #[must_use]
    pub fn measurements(&self) -> &[Measurement] {
        match self {
            MeterEvent::Measurements(batch) => batch,
            _ => &[],
        }
    }
}

/// Application sink that publishes every callback as a [`MeterEvent`]
///
/// Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<MeterEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<MeterEvent>) -> Self {
        Self { tx }
    }

    fn publish(&self, event: MeterEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Event receiver closed");
        }
    }
}

impl ApplicationSink for EventSink {
    fn measurements_received(&mut self, measurements: Vec<Measurement>) {
        self.publish(MeterEvent::Measurements(measurements));
    }

    fn protocol_error(&mut self, error: &OneTouchError) {
        self.publish(MeterEvent::Error(error.clone()));
    }

    fn device_time_read(&mut self, device_time: DateTime<Utc>) {
        self.publish(MeterEvent::DeviceTime(device_time));
    }

    fn limit_updated(&mut self, kind: LimitKind, value: u16) {
        self.publish(MeterEvent::Limit { kind, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_sink_publishes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = EventSink::new(tx);
        sink.protocol_error(&OneTouchError::NotConnected);
        sink.limit_updated(LimitKind::Low, 72);

        let first = rx.try_recv().unwrap();
        assert!(first.is_error());
        assert!(first.measurements().is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            MeterEvent::Limit {
                kind: LimitKind::Low,
                value: 72
            }
        );
    }

    #[test]
    fn test_closed_receiver_is_tolerated() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        EventSink::new(tx).measurements_received(Vec::new());
    }
}
