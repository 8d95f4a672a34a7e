//! Builder for the async meter client
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use onetouch_client::MeterClientBuilder;
//! use std::time::Duration;
//!
//! # fn demo() -> onetouch_core::OneTouchResult<()> {
//! let (client, channels) = MeterClientBuilder::new()
//!     .mtu(182)
//!     .response_timeout(Some(Duration::from_secs(3)))
//!     .poll_interval(Duration::from_secs(300))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::client::{run_session, MeterChannels, MeterClient, TaskTiming};
use crate::event::EventSink;
use onetouch_application::{MeterSession, SessionConfig, SyncState};
use onetouch_core::{Clock, OneTouchError, OneTouchResult, SystemClock};
use onetouch_transport::ChannelSink;
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of the request queue in front of the session task
const REQUEST_QUEUE_DEPTH: usize = 64;

/// Builder for [`MeterClient`]
///
/// # Default Settings
/// - MTU: 20 bytes
/// - Response timeout: 5 seconds
/// - Watchdog tick: 100 ms
/// - No scheduled polling
#[derive(Debug, Clone)]
pub struct MeterClientBuilder {
    config: SessionConfig,
    tick_interval: Duration,
    poll_interval: Option<Duration>,
    sync: SyncState,
}

impl MeterClientBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            tick_interval: Duration::from_millis(100),
            poll_interval: None,
            sync: SyncState::default(),
        }
    }

    /// Start from an existing session configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Negotiated chunk size of the byte pipe
    pub fn mtu(mut self, mtu: usize) -> Self {
        self.config.link.mtu = mtu;
        self
    }

    /// Bound on the wait for each response; `None` waits forever
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// How often the watchdog is advanced
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Poll the meter for new records on this period while connected and idle
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Resume from sync progress saved by an earlier run
    pub fn sync_state(mut self, sync: SyncState) -> Self {
        self.sync = sync;
        self
    }

    /// Spawn the session task using the wall clock
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `InvalidData` for an invalid MTU or a zero interval
    pub fn build(self) -> OneTouchResult<(MeterClient, MeterChannels)> {
        self.build_with_clock(SystemClock)
    }

    /// Spawn the session task with an explicit clock
    pub fn build_with_clock<C>(self, clock: C) -> OneTouchResult<(MeterClient, MeterChannels)>
    where
        C: Clock + Send + 'static,
    {
        if self.tick_interval.is_zero() {
            return Err(OneTouchError::InvalidData(
                "tick interval must be non-zero".to_string(),
            ));
        }
        if self.poll_interval.is_some_and(|p| p.is_zero()) {
            return Err(OneTouchError::InvalidData(
                "poll interval must be non-zero".to_string(),
            ));
        }

        let (transport, outbound) = ChannelSink::channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let session =
            MeterSession::with_clock(self.config, transport, EventSink::new(event_tx), clock)?
                .with_sync_state(self.sync);

        let (tx, requests) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let timing = TaskTiming {
            tick_interval: self.tick_interval,
            poll_interval: self.poll_interval,
        };
        let task = tokio::spawn(run_session(session, requests, timing));

        Ok((
            MeterClient::new(tx),
            MeterChannels {
                outbound,
                events,
                task,
            },
        ))
    }
}

impl Default for MeterClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
