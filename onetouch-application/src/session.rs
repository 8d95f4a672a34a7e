//! Meter session
//!
//! Drives one meter connection: sets the clock, enumerates stored records by
//! index the first time, and afterwards polls by record id for anything newer
//! than the last synced id.
//!
//! The session owns its fragment link and is fully synchronous. Inbound chunks
//! come in through [`MeterSession::on_bytes_received`], outbound chunks go out
//! through the transport sink, and results go up through the application
//! sink. Everything is single-threaded; wrap the session in a task (see the
//! client crate) to use it from async code.

use crate::command::{Command, LimitKind};
use crate::config::SessionConfig;
use crate::response::{IndexedRecord, RecordFields, Response};
use crate::sink::ApplicationSink;
use crate::state::{LimitOp, RecordAddress, SessionState, SyncState};
use crate::statistics::SessionStatistics;
use crate::watchdog::ResponseWatchdog;
use onetouch_core::device_time::{device_to_host, host_to_device};
use onetouch_core::{Clock, Measurement, OneTouchError, OneTouchResult, SystemClock};
use onetouch_session::packet::{decode_response, encode_request};
use onetouch_session::{FragmentLink, LinkStatistics};
use onetouch_transport::{hex, TransportSink};
use std::time::Duration;

/// Host side of a meter connection
pub struct MeterSession<T, A, C = SystemClock> {
    link: FragmentLink,
    transport: T,
    application: A,
    clock: C,
    state: SessionState,
    sync: SyncState,
    /// Records fetched but not yet delivered
    batch: Vec<Measurement>,
    connected: bool,
    watchdog: ResponseWatchdog,
    statistics: SessionStatistics,
}

impl<T: TransportSink, A: ApplicationSink> MeterSession<T, A, SystemClock> {
    /// Create a session using the wall clock
    ///
    /// # Errors
    /// Returns `InvalidData` if the link parameters are invalid
    pub fn new(config: SessionConfig, transport: T, application: A) -> OneTouchResult<Self> {
        Self::with_clock(config, transport, application, SystemClock)
    }
}

impl<T, A, C> MeterSession<T, A, C>
where
    T: TransportSink,
    A: ApplicationSink,
    C: Clock,
{
    /// Create a session with an explicit clock
    pub fn with_clock(
        config: SessionConfig,
        transport: T,
        application: A,
        clock: C,
    ) -> OneTouchResult<Self> {
        config.validate()?;
        Ok(Self {
            link: FragmentLink::new(config.link)?,
            transport,
            application,
            clock,
            state: SessionState::Idle,
            sync: SyncState::default(),
            batch: Vec::new(),
            connected: false,
            watchdog: ResponseWatchdog::new(config.response_timeout),
            statistics: SessionStatistics::new(),
        })
    }

    /// Start from previously persisted sync progress
    pub fn with_sync_state(mut self, sync: SyncState) -> Self {
        self.sync = sync;
        self
    }

    /// The pipe is up: read the meter clock to start the handshake
    ///
    /// # Errors
    /// Returns `Busy` if a request is still outstanding
    pub fn connect(&mut self) -> OneTouchResult<()> {
        if !self.state.is_idle() || !self.link.is_idle() {
            return Err(OneTouchError::Busy(format!(
                "session is {}, link is {}",
                self.state,
                self.link.state()
            )));
        }
        self.send_command(Command::GetTime)?;
        log::info!("Connected, synced to latest: {}", self.sync.synced_to_latest);
        self.connected = true;
        Ok(())
    }

    /// The pipe is gone
    ///
    /// Cancels the outstanding request and drops records not yet delivered.
    /// Sync progress returns to the last delivered record; whether a full sweep
    /// has completed is kept.
    pub fn disconnect(&mut self) {
        log::info!("Disconnected in {}", self.state);
        self.abort();
        self.connected = false;
    }

    /// Fetch records newer than the last synced id
    ///
    /// Runs the full index sweep instead if none has completed yet.
    ///
    /// # Errors
    /// - `NotConnected` before `connect()`
    /// - `Busy` while a request is outstanding
    pub fn poll(&mut self) -> OneTouchResult<()> {
        self.ensure_ready()?;
        if self.sync.synced_to_latest {
            self.send_command(Command::GetHighestId)
        } else {
            self.send_command(Command::GetOldestIndex)
        }
    }

    /// Enumerate every stored record, newest first
    ///
    /// # Errors
    /// - `NotConnected` before `connect()`
    /// - `Busy` while a request is outstanding
    pub fn request_stored_measurements(&mut self) -> OneTouchResult<()> {
        self.ensure_ready()?;
        self.send_command(Command::GetOldestIndex)
    }

    /// Read a glucose alarm limit, reported through `limit_updated`
    pub fn read_limit(&mut self, kind: LimitKind) -> OneTouchResult<()> {
        self.ensure_ready()?;
        self.send_command(Command::ReadLimit(kind))
    }

    /// Write a glucose alarm limit, reported through `limit_updated` once acknowledged
    pub fn write_limit(&mut self, kind: LimitKind, value: u16) -> OneTouchResult<()> {
        self.ensure_ready()?;
        self.send_command(Command::WriteLimit(kind, value))
    }

    /// Handle one inbound chunk from the pipe
    ///
    /// Errors are reported to the application sink and never returned; the
    /// session stays in its current state and keeps waiting.
    pub fn on_bytes_received(&mut self, bytes: &[u8]) {
        match self.link.on_bytes_received(bytes, &mut self.transport) {
            Ok(delivered) => {
                self.watchdog.touch();
                if let Some(frame) = delivered {
                    self.handle_frame(&frame);
                }
            }
            Err(e) => {
                self.statistics.fragment_violations += 1;
                self.report(e);
            }
        }
    }

    /// Report elapsed time to the response watchdog
    ///
    /// When the outstanding request has waited past the configured bound, the
    /// session reports `ResponseTimeout`, resets the link and returns to idle.
    /// The connection itself stays up.
    pub fn tick(&mut self, elapsed: Duration) {
        let Some(waited) = self.watchdog.advance(elapsed) else {
            return;
        };
        self.statistics.timeouts += 1;
        let error = OneTouchError::ResponseTimeout {
            state: self.state.to_string(),
            waited,
        };
        self.abort();
        self.report(error);
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        self.statistics.frames_received += 1;
        let payload = match decode_response(frame) {
            Ok(payload) => payload,
            Err(e) => {
                match e {
                    OneTouchError::BadCrc { .. } => self.statistics.crc_errors += 1,
                    _ => self.statistics.length_errors += 1,
                }
                self.report(e);
                return;
            }
        };
        log::debug!("Packet received in {}: {}", self.state, hex(&payload));

        let awaiting = self.state;
        match Response::parse(&awaiting, &payload) {
            Ok(response) => self.handle_response(awaiting, response),
            Err(e) => {
                self.statistics.shape_errors += 1;
                self.report(e);
            }
        }
    }

    fn handle_response(&mut self, awaiting: SessionState, response: Response) {
        match response {
            Response::DeviceTime(device_seconds) => {
                let device_time = device_to_host(device_seconds);
                log::info!("Device time {}", device_time);
                self.application.device_time_read(device_time);
                let now = host_to_device(self.clock.now());
                self.follow_up(Command::SetTime(now));
            }
            Response::TimeSetAck => {
                if self.sync.synced_to_latest {
                    self.follow_up(Command::GetHighestId);
                } else {
                    self.follow_up(Command::GetOldestIndex);
                }
            }
            Response::RecordCount(count) => {
                log::info!("Meter holds {} record(s)", count);
                self.sync.total_record_count = count;
                if count == 0 {
                    self.finish_index_sweep();
                } else {
                    self.follow_up(Command::GetMeasurementByIndex(count - 1));
                }
            }
            Response::IndexedRecord(record) => {
                if let SessionState::WaitingMeasurement {
                    address: RecordAddress::Index(requested),
                } = awaiting
                {
                    self.on_indexed_record(requested, record);
                }
            }
            Response::HighestId(id) => self.on_highest_id(id),
            Response::Record(fields) => {
                if let SessionState::WaitingMeasurement {
                    address: RecordAddress::Id(requested),
                } = awaiting
                {
                    self.on_id_record(requested, Some(fields));
                }
            }
            Response::RecordNotFound => {
                if let SessionState::WaitingMeasurement {
                    address: RecordAddress::Id(requested),
                } = awaiting
                {
                    self.on_id_record(requested, None);
                }
            }
            Response::LimitValue(value) => {
                if let SessionState::WaitingLimit { kind, .. } = awaiting {
                    self.enter_idle();
                    self.application.limit_updated(kind, value);
                }
            }
            Response::LimitAck => {
                if let SessionState::WaitingLimit {
                    kind,
                    op: LimitOp::Write(value),
                } = awaiting
                {
                    self.enter_idle();
                    self.application.limit_updated(kind, value);
                }
            }
        }
    }

    fn on_indexed_record(&mut self, requested: u16, record: IndexedRecord) {
        if record.index != requested {
            log::warn!("Asked for index {} but meter answered {}", requested, record.index);
        }
        self.sync.highest_known_id = self.sync.highest_known_id.max(record.id);
        self.sync.highest_synced_id = self.sync.highest_known_id;
        self.batch.push(Measurement::new(
            f32::from(record.value),
            device_to_host(record.device_time),
            record.id,
        ));

        if record.index == 0 {
            self.finish_index_sweep();
        } else {
            self.follow_up(Command::GetMeasurementByIndex(record.index - 1));
        }
    }

    /// Deliver the sweep and check whether records arrived meanwhile
    fn finish_index_sweep(&mut self) {
        self.flush();
        self.sync.synced_to_latest = true;
        self.follow_up(Command::GetHighestId);
    }

    fn on_highest_id(&mut self, id: u16) {
        if id > self.sync.highest_known_id {
            log::info!(
                "Fetching records {}..={}",
                self.sync.highest_known_id.wrapping_add(1),
                id
            );
            self.sync.highest_synced_id = self.sync.highest_known_id;
            self.sync.highest_known_id = id;
            self.follow_up(Command::GetMeasurementById(self.sync.highest_synced_id + 1));
        } else {
            log::debug!("Up to date at record {}", self.sync.highest_known_id);
            self.enter_idle();
        }
    }

    fn on_id_record(&mut self, requested: u16, fields: Option<RecordFields>) {
        self.sync.highest_synced_id = requested;
        match fields {
            Some(fields) => self.batch.push(Measurement::with_error(
                f32::from(fields.value),
                device_to_host(fields.device_time),
                requested,
                fields.error_code,
            )),
            None => log::debug!("Record {} not found", requested),
        }

        if self.sync.highest_synced_id < self.sync.highest_known_id {
            self.follow_up(Command::GetMeasurementById(requested + 1));
        } else {
            self.flush();
            self.enter_idle();
        }
    }

    /// Hand the batch to the application and move the commit point
    fn flush(&mut self) {
        if !self.batch.is_empty() {
            let batch = std::mem::take(&mut self.batch);
            log::info!("Delivering {} measurement(s)", batch.len());
            self.statistics.batches_delivered += 1;
            self.statistics.measurements_delivered += batch.len() as u64;
            self.application.measurements_received(batch);
        }
        self.sync.commit();
    }

    fn ensure_ready(&self) -> OneTouchResult<()> {
        if !self.connected {
            return Err(OneTouchError::NotConnected);
        }
        if !self.state.is_idle() || !self.link.is_idle() {
            return Err(OneTouchError::Busy(format!("session is {}", self.state)));
        }
        Ok(())
    }

    fn send_command(&mut self, command: Command) -> OneTouchResult<()> {
        let payload = command.payload();
        let frame = encode_request(&payload)?;
        log::debug!("Sending {}: {}", command, hex(&payload));
        self.link.send(&frame, &mut self.transport)?;
        self.statistics.frames_sent += 1;
        self.state = command.awaiting();
        self.watchdog.arm();
        Ok(())
    }

    /// Send the next request of an exchange triggered by a response
    fn follow_up(&mut self, command: Command) {
        if let Err(e) = self.send_command(command) {
            self.abort();
            self.report(e);
        }
    }

    fn enter_idle(&mut self) {
        self.state = SessionState::Idle;
        self.watchdog.disarm();
    }

    fn abort(&mut self) {
        self.link.reset();
        if !self.batch.is_empty() {
            log::warn!("Discarding {} undelivered measurement(s)", self.batch.len());
            self.batch.clear();
        }
        self.sync.rollback();
        self.enter_idle();
    }

    fn report(&mut self, error: OneTouchError) {
        log::warn!("{}", error);
        self.application.protocol_error(&error);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Records fetched in the current exchange but not yet delivered
    pub fn pending_measurements(&self) -> &[Measurement] {
        &self.batch
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    pub fn link_statistics(&self) -> &LinkStatistics {
        self.link.statistics()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn application(&self) -> &A {
        &self.application
    }

    pub fn application_mut(&mut self) -> &mut A {
        &mut self.application
    }
}
