//! Simulated meter endpoint

use crate::store::RecordStore;
use onetouch_application::{Command, LimitKind};
use onetouch_core::OneTouchResult;
use onetouch_session::packet::{decode_request, encode_response};
use onetouch_session::{FragmentLink, LinkParameters};
use onetouch_transport::{hex, RecordingSink};
use serde::{Deserialize, Serialize};

/// Simulated meter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterConfig {
    pub link: LinkParameters,
    /// Initial device clock, seconds since the device epoch
    pub device_time: u32,
    pub low_limit: u16,
    pub high_limit: u16,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            link: LinkParameters::default(),
            device_time: 0,
            low_limit: 70,
            high_limit: 180,
        }
    }
}

/// Device side of the protocol
///
/// Feed it the chunks a host sends; it returns the chunks the meter sends
/// back (ACKs and response fragments) in wire order.
#[derive(Debug)]
pub struct SimulatedMeter {
    link: FragmentLink,
    outbound: RecordingSink,
    store: RecordStore,
    device_time: u32,
    low_limit: u16,
    high_limit: u16,
    /// When false, requests are acknowledged but never answered
    responsive: bool,
    commands: Vec<Command>,
}

impl SimulatedMeter {
    /// Create a meter with an empty record store
    ///
    /// # Errors
    /// Returns `InvalidData` if the link parameters are invalid
    pub fn new(config: MeterConfig) -> OneTouchResult<Self> {
        Ok(Self {
            link: FragmentLink::new(config.link)?,
            outbound: RecordingSink::new(),
            store: RecordStore::new(),
            device_time: config.device_time,
            low_limit: config.low_limit,
            high_limit: config.high_limit,
            responsive: true,
            commands: Vec::new(),
        })
    }

    /// Handle one chunk from the host, returning the chunks to send back
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        match self.link.on_bytes_received(chunk, &mut self.outbound) {
            Ok(Some(buffer)) => self.handle_request(&buffer),
            Ok(None) => {}
            Err(e) => log::warn!("Meter dropped chunk: {}", e),
        }
        self.outbound.drain()
    }

    fn handle_request(&mut self, buffer: &[u8]) {
        let payload = match decode_request(buffer) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Meter rejected frame: {}", e);
                return;
            }
        };
        let Some(command) = Command::parse(&payload) else {
            log::warn!("Meter ignoring unknown command {}", hex(&payload));
            return;
        };
        log::debug!("Meter received {}", command);
        self.commands.push(command);
        if !self.responsive {
            return;
        }

        let response = self.respond(command);
        let sent = encode_response(&response)
            .and_then(|frame| self.link.send(&frame, &mut self.outbound));
        if let Err(e) = sent {
            log::error!("Meter could not answer {}: {}", command, e);
        }
    }

    /// Build the response payload for a command, applying its side effects
    pub fn respond(&mut self, command: Command) -> Vec<u8> {
        match command {
            Command::GetTime => self.device_time.to_le_bytes().to_vec(),
            Command::SetTime(seconds) => {
                self.device_time = seconds;
                Vec::new()
            }
            Command::GetOldestIndex => {
                let count = u16::try_from(self.store.len()).unwrap_or(u16::MAX);
                count.to_le_bytes().to_vec()
            }
            Command::GetHighestId => u32::from(self.store.highest_id()).to_le_bytes().to_vec(),
            Command::GetMeasurementByIndex(index) => match self.store.by_index(index) {
                Some(record) => {
                    let mut payload = Vec::with_capacity(16);
                    payload.extend_from_slice(&index.to_le_bytes());
                    payload.push(0x00);
                    payload.extend_from_slice(&record.id.to_le_bytes());
                    payload.extend_from_slice(&record.device_time.to_le_bytes());
                    payload.extend_from_slice(&record.value.to_le_bytes());
                    payload.extend_from_slice(&[0x00; 5]);
                    payload
                }
                None => Vec::new(),
            },
            Command::GetMeasurementById(id) => match self.store.by_id(id) {
                Some(record) => {
                    let mut payload = Vec::with_capacity(11);
                    payload.extend_from_slice(&record.device_time.to_le_bytes());
                    payload.extend_from_slice(&record.value.to_le_bytes());
                    payload.extend_from_slice(&[0x00; 3]);
                    payload.extend_from_slice(&record.error_code.to_le_bytes());
                    payload
                }
                None => Vec::new(),
            },
            Command::ReadLimit(kind) => {
                let mut payload = self.limit(kind).to_le_bytes().to_vec();
                payload.extend_from_slice(&[0x00, 0x00]);
                payload
            }
            Command::WriteLimit(kind, value) => {
                match kind {
                    LimitKind::Low => self.low_limit = value,
                    LimitKind::High => self.high_limit = value,
                }
                Vec::new()
            }
        }
    }

    /// Take a new reading at the current device time
    pub fn record(&mut self, value: i16) -> u16 {
        self.store.push(self.device_time, value, 0)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    pub fn device_time(&self) -> u32 {
        self.device_time
    }

    pub fn advance_clock(&mut self, seconds: u32) {
        self.device_time = self.device_time.saturating_add(seconds);
    }

    pub fn limit(&self, kind: LimitKind) -> u16 {
        match kind {
            LimitKind::Low => self.low_limit,
            LimitKind::High => self.high_limit,
        }
    }

    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    /// Commands received so far, in arrival order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drop any half-finished exchange, as after a radio disconnect
    pub fn reset_link(&mut self) {
        self.link.reset();
        self.outbound.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onetouch_application::{MeterSession, RecordingApplication, SessionConfig, SessionState, SyncState};
    use onetouch_core::device_time::device_to_host;
    use onetouch_core::{FixedClock, OneTouchError};
    use std::time::Duration;

    const HOST_NOW: u32 = 790_000_000;

    type Host = MeterSession<RecordingSink, RecordingApplication, FixedClock>;

    fn host(mtu: usize, sync: SyncState) -> Host {
        MeterSession::with_clock(
            SessionConfig::default().with_mtu(mtu),
            RecordingSink::new(),
            RecordingApplication::new(),
            FixedClock(device_to_host(HOST_NOW)),
        )
        .unwrap()
        .with_sync_state(sync)
    }

    fn meter(mtu: usize) -> SimulatedMeter {
        let config = MeterConfig {
            link: LinkParameters::new(mtu),
            device_time: 1_000,
            ..MeterConfig::default()
        };
        SimulatedMeter::new(config).unwrap()
    }

    /// Bounce chunks between host and meter until both are quiet
    fn run(host: &mut Host, meter: &mut SimulatedMeter) {
        loop {
            let outbound = host.transport_mut().drain();
            if outbound.is_empty() {
                return;
            }
            for chunk in outbound {
                for reply in meter.feed(&chunk) {
                    host.on_bytes_received(&reply);
                }
            }
        }
    }

    fn record_ids(app: &RecordingApplication) -> Vec<String> {
        app.measurements().into_iter().map(|m| m.record_id).collect()
    }

    #[test]
    fn test_respond_shapes() {
        let mut meter = meter(20);
        meter.record(105);
        assert_eq!(meter.respond(Command::GetTime).len(), 4);
        assert_eq!(meter.respond(Command::GetOldestIndex), vec![1, 0]);
        assert_eq!(meter.respond(Command::GetHighestId), vec![1, 0, 0, 0]);
        assert_eq!(meter.respond(Command::GetMeasurementByIndex(0)).len(), 16);
        assert!(meter.respond(Command::GetMeasurementByIndex(1)).is_empty());
        assert_eq!(meter.respond(Command::GetMeasurementById(1)).len(), 11);
        assert!(meter.respond(Command::GetMeasurementById(2)).is_empty());
        assert!(meter.respond(Command::SetTime(42)).is_empty());
        assert_eq!(meter.device_time(), 42);
    }

    #[test]
    fn test_full_then_incremental_sync() {
        for mtu in [8usize, 20, 64] {
            let mut meter = meter(mtu);
            for value in [90, 100, 110] {
                meter.record(value);
                meter.advance_clock(60);
            }
            let mut host = host(mtu, SyncState::default());

            host.connect().unwrap();
            run(&mut host, &mut meter);

            assert_eq!(meter.device_time(), HOST_NOW, "mtu {}", mtu);
            assert_eq!(host.application().device_times, vec![device_to_host(1_180)]);
            assert_eq!(host.application().batches.len(), 1);
            assert_eq!(record_ids(host.application()), vec!["1", "2", "3"]);
            assert_eq!(host.state(), SessionState::Idle);
            assert!(host.sync_state().synced_to_latest);

            meter.record(120);
            meter.record(130);
            host.poll().unwrap();
            run(&mut host, &mut meter);

            assert_eq!(host.application().batches.len(), 2);
            assert_eq!(record_ids(host.application()), vec!["1", "2", "3", "4", "5"]);
            assert_eq!(host.application().batches[1][0].value, 120.0);
            assert!(host.application().errors.is_empty(), "mtu {}", mtu);
        }
    }

    #[test]
    fn test_deleted_record_is_skipped() {
        let mut meter = meter(20);
        for value in [90, 100, 110, 120] {
            meter.record(value);
        }
        meter.store_mut().remove(3);
        let mut host = host(20, SyncState::resume(1));

        host.connect().unwrap();
        run(&mut host, &mut meter);

        assert_eq!(record_ids(host.application()), vec!["2", "4"]);
        assert_eq!(host.sync_state().highest_synced_id, 4);
        assert_eq!(
            &meter.commands()[meter.commands().len() - 3..],
            &[
                Command::GetMeasurementById(2),
                Command::GetMeasurementById(3),
                Command::GetMeasurementById(4)
            ]
        );
    }

    #[test]
    fn test_limits_round_trip() {
        let mut meter = meter(20);
        let mut host = host(20, SyncState::default());
        host.connect().unwrap();
        run(&mut host, &mut meter);

        host.write_limit(LimitKind::High, 200).unwrap();
        run(&mut host, &mut meter);
        host.read_limit(LimitKind::High).unwrap();
        run(&mut host, &mut meter);

        assert_eq!(meter.limit(LimitKind::High), 200);
        assert_eq!(
            host.application().limits,
            vec![(LimitKind::High, 200), (LimitKind::High, 200)]
        );
    }

    #[test]
    fn test_silent_meter_times_out() {
        let mut meter = meter(20);
        meter.set_responsive(false);
        let mut host = host(20, SyncState::default());

        host.connect().unwrap();
        run(&mut host, &mut meter);
        assert_eq!(host.state(), SessionState::WaitingTime);

        host.tick(Duration::from_secs(6));
        assert_eq!(host.state(), SessionState::Idle);
        assert!(matches!(
            host.application().errors[..],
            [OneTouchError::ResponseTimeout { .. }]
        ));

        meter.set_responsive(true);
        host.poll().unwrap();
        run(&mut host, &mut meter);
        assert!(host.sync_state().synced_to_latest);
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let mut meter = meter(20);
        let mut frame = vec![0x01];
        frame.extend_from_slice(&onetouch_session::packet::encode_request(&[0x99]).unwrap());
        assert_eq!(meter.feed(&frame), vec![vec![0x81u8]]);
        assert!(meter.commands().is_empty());
    }
}
