//! Client handle and session task

use crate::event::{EventSink, MeterEvent};
use bytes::Bytes;
use onetouch_application::{LimitKind, MeterSession, SessionStatistics, SyncState};
use onetouch_core::{Clock, OneTouchError, OneTouchResult};
use onetouch_transport::ChannelSink;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Request queued to the session task
#[derive(Debug)]
pub(crate) enum ClientRequest {
    Connect(Reply<OneTouchResult<()>>),
    Disconnect(Reply<OneTouchResult<()>>),
    Poll(Reply<OneTouchResult<()>>),
    RequestStoredMeasurements(Reply<OneTouchResult<()>>),
    ReadLimit(LimitKind, Reply<OneTouchResult<()>>),
    WriteLimit(LimitKind, u16, Reply<OneTouchResult<()>>),
    Inbound(Bytes),
    SyncState(Reply<SyncState>),
    Statistics(Reply<SessionStatistics>),
    Shutdown,
}

/// Receiving ends handed out by the builder
#[derive(Debug)]
pub struct MeterChannels {
    /// Chunks to write to the meter, in order
    pub outbound: mpsc::UnboundedReceiver<Bytes>,
    pub events: mpsc::UnboundedReceiver<MeterEvent>,
    /// The session task; completes after `shutdown()`
    pub task: JoinHandle<()>,
}

/// Handle to a running meter session
///
/// Cheap to clone. Every method fails with `ChannelClosed` once the session
/// task has stopped.
#[derive(Debug, Clone)]
pub struct MeterClient {
    tx: mpsc::Sender<ClientRequest>,
}

impl MeterClient {
    pub(crate) fn new(tx: mpsc::Sender<ClientRequest>) -> Self {
        Self { tx }
    }

    /// The link is up; starts the clock handshake and initial sync
    pub async fn connect(&self) -> OneTouchResult<()> {
        self.request(ClientRequest::Connect).await?
    }

    /// The link is gone
    pub async fn disconnect(&self) -> OneTouchResult<()> {
        self.request(ClientRequest::Disconnect).await?
    }

    /// Fetch records newer than the last synced one
    pub async fn poll(&self) -> OneTouchResult<()> {
        self.request(ClientRequest::Poll).await?
    }

    /// Re-read every stored record
    pub async fn request_stored_measurements(&self) -> OneTouchResult<()> {
        self.request(ClientRequest::RequestStoredMeasurements).await?
    }

    pub async fn read_limit(&self, kind: LimitKind) -> OneTouchResult<()> {
        self.request(|reply| ClientRequest::ReadLimit(kind, reply)).await?
    }

    pub async fn write_limit(&self, kind: LimitKind, value: u16) -> OneTouchResult<()> {
        self.request(|reply| ClientRequest::WriteLimit(kind, value, reply))
            .await?
    }

    /// Hand a chunk read from the meter to the session
    pub async fn bytes_received(&self, bytes: Bytes) -> OneTouchResult<()> {
        self.tx
            .send(ClientRequest::Inbound(bytes))
            .await
            .map_err(|_| OneTouchError::ChannelClosed)
    }

    /// Current sync progress, for persisting across restarts
    pub async fn sync_state(&self) -> OneTouchResult<SyncState> {
        self.request(ClientRequest::SyncState).await
    }

    pub async fn statistics(&self) -> OneTouchResult<SessionStatistics> {
        self.request(ClientRequest::Statistics).await
    }

    /// Stop the session task
    pub async fn shutdown(&self) -> OneTouchResult<()> {
        self.tx
            .send(ClientRequest::Shutdown)
            .await
            .map_err(|_| OneTouchError::ChannelClosed)
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(Reply<R>) -> ClientRequest,
    ) -> OneTouchResult<R> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| OneTouchError::ChannelClosed)?;
        response.await.map_err(|_| OneTouchError::ChannelClosed)
    }
}

/// Session task settings
#[derive(Debug, Clone, Copy)]
pub(crate) struct TaskTiming {
    pub tick_interval: Duration,
    pub poll_interval: Option<Duration>,
}

pub(crate) async fn run_session<C: Clock>(
    mut session: MeterSession<ChannelSink, EventSink, C>,
    mut requests: mpsc::Receiver<ClientRequest>,
    timing: TaskTiming,
) {
    let mut ticker = time::interval(timing.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    let mut poller = timing.poll_interval.map(|period| {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    log::info!("Meter client started");
    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(ClientRequest::Shutdown) | None => break,
                Some(request) => handle_request(&mut session, request),
            },
            _ = ticker.tick() => {
                let now = Instant::now();
                session.tick(now - last_tick);
                last_tick = now;
            }
            _ = next_poll(&mut poller) => {
                if session.is_connected() && session.state().is_idle() {
                    if let Err(e) = session.poll() {
                        log::debug!("Scheduled poll skipped: {}", e);
                    }
                }
            }
        }
    }

    if session.is_connected() {
        session.disconnect();
    }
    log::info!("Meter client stopped");
}

async fn next_poll(poller: &mut Option<Interval>) {
    match poller {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn handle_request<C: Clock>(
    session: &mut MeterSession<ChannelSink, EventSink, C>,
    request: ClientRequest,
) {
    // A dropped reply receiver just means the caller stopped waiting
    match request {
        ClientRequest::Connect(reply) => {
            let _ = reply.send(session.connect());
        }
        ClientRequest::Disconnect(reply) => {
            session.disconnect();
            let _ = reply.send(Ok(()));
        }
        ClientRequest::Poll(reply) => {
            let _ = reply.send(session.poll());
        }
        ClientRequest::RequestStoredMeasurements(reply) => {
            let _ = reply.send(session.request_stored_measurements());
        }
        ClientRequest::ReadLimit(kind, reply) => {
            let _ = reply.send(session.read_limit(kind));
        }
        ClientRequest::WriteLimit(kind, value, reply) => {
            let _ = reply.send(session.write_limit(kind, value));
        }
        ClientRequest::Inbound(bytes) => session.on_bytes_received(&bytes),
        ClientRequest::SyncState(reply) => {
            let _ = reply.send(*session.sync_state());
        }
        ClientRequest::Statistics(reply) => {
            let _ = reply.send(session.statistics().clone());
        }
        ClientRequest::Shutdown => {}
    }
}
