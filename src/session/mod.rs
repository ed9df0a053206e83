//! Router session
//!
//! One background task per session drives a fixed tick. Every
//! `statistics_interval_ticks` ticks it polls traffic statistics, every
//! `heartbeat_interval_ticks` ticks it refreshes the heartbeat. The call
//! monitor socket, when enabled, runs in its own transport task and feeds
//! events to the hub as they arrive.
//!
//! The statistics request is awaited inside the tick, so a slow router
//! delays the following ticks by at most `router.request_timeout`.

use crate::callmonitor::{CallMonitorHandler, EventDispatcher, LineFramer};
use crate::config::MonitorConfig;
use crate::error::{ErrorReporter, FritzboxError, Result};
use crate::hub::{SensorSink, SwitchRegistry};
use crate::statistics::{SoapClient, StatisticsPoller};
use crate::transport::TransportHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Call monitor connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Session not started yet
    Idle,
    /// Connection attempt in progress
    Connecting,
    /// Call monitor socket is connected
    Connected,
    /// Connection lost, waiting to reconnect
    Disconnected,
    /// Session stopped
    Stopped,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Tick bookkeeping owned by the worker
#[derive(Debug)]
struct TickSchedule {
    counter: u64,
    statistics_every: u64,
    heartbeat_every: u64,
}

impl TickSchedule {
    fn new(statistics_every: u32, heartbeat_every: u32) -> Self {
        let statistics_every = u64::from(statistics_every.max(1));
        Self {
            // First poll lands on the second tick
            counter: statistics_every.saturating_sub(2),
            statistics_every,
            heartbeat_every: u64::from(heartbeat_every.max(1)),
        }
    }

    /// Advance one tick, returning (poll statistics, beat heartbeat)
    fn advance(&mut self) -> (bool, bool) {
        self.counter = self.counter.wrapping_add(1);
        (
            self.counter % self.statistics_every == 0,
            self.counter % self.heartbeat_every == 0,
        )
    }
}

/// Session against one router
pub struct RouterSession {
    config: Arc<MonitorConfig>,
    sensors: Arc<dyn SensorSink>,
    switches: Arc<dyn SwitchRegistry>,
    state: watch::Sender<ConnectionState>,
    heartbeat: Arc<RwLock<Option<DateTime<Utc>>>>,
    running: Arc<AtomicBool>,
    retry_delay: std::time::Duration,
    transport: Option<Arc<TransportHandle>>,
    worker: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl RouterSession {
    pub fn new(
        config: MonitorConfig,
        sensors: Arc<dyn SensorSink>,
        switches: Arc<dyn SwitchRegistry>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        let retry_delay = config.session.retry_delay;
        Self {
            config: Arc::new(config),
            sensors,
            switches,
            state,
            heartbeat: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            retry_delay,
            transport: None,
            worker: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start the worker and, when enabled, the call monitor connection
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() || self.worker.is_some() {
            return Err(FritzboxError::invalid_input("session is already running"));
        }
        self.config.validate()?;

        let router = &self.config.router;
        let soap = SoapClient::new(&router.host, router.soap_port, router.request_timeout)?;
        let poller = StatisticsPoller::new(soap, self.sensors.clone(), router.host.clone());

        self.retry_delay = self.config.session.retry_delay;
        self.cancel = CancellationToken::new();
        self.running.store(true, Ordering::SeqCst);

        self.transport = if router.call_monitor_enabled() {
            let mut transport_config = self.config.transport();
            transport_config.retry_delay = self.retry_delay;

            let handler = CallMonitorHandler::new(
                LineFramer::with_capacity(self.config.session.line_capacity),
                EventDispatcher::new(self.sensors.clone(), self.switches.clone()),
                self.state.clone(),
                transport_config.endpoint(),
            );
            info!("Starting call monitor for {}", transport_config.endpoint());
            Some(Arc::new(TransportHandle::connect(transport_config, handler)))
        } else {
            info!(
                "Call monitor disabled, polling statistics from {} only",
                router.host
            );
            None
        };

        self.worker = Some(tokio::spawn(run_worker(
            self.config.clone(),
            poller,
            self.transport.clone(),
            self.heartbeat.clone(),
            self.cancel.clone(),
        )));

        Ok(())
    }

    /// Stop the worker, close the connection and wait for both to finish
    ///
    /// No hub updates are issued once this returns.
    pub async fn stop(&mut self) {
        self.cancel.cancel();

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("Session worker ended abnormally: {}", e);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.terminate().await;
        }

        self.running.store(false, Ordering::SeqCst);
        self.state.send_replace(ConnectionState::Stopped);
    }

    /// Observe connection state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Time of the last heartbeat, if one has happened
    pub async fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        *self.heartbeat.read().await
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the call monitor socket is connected
    pub fn is_connected(&self) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|transport| transport.is_connected())
    }

    /// Send raw bytes to the router over the call monitor socket
    pub fn write(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        match &self.transport {
            Some(transport) => transport.write(data),
            None => Err(FritzboxError::connection("call monitor is not enabled")),
        }
    }
}

impl Drop for RouterSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Report a failed statistics poll
///
/// Returns whether the failure is expected to clear by the next poll.
fn report_poll_failure(error: &FritzboxError, retry_in_ticks: u64) -> bool {
    if error.is_retryable() {
        debug!("Statistics poll will be retried in {} ticks", retry_in_ticks);
        true
    } else {
        ErrorReporter::log_error(error, "session", "statistics");
        false
    }
}

async fn run_worker(
    config: Arc<MonitorConfig>,
    poller: StatisticsPoller,
    transport: Option<Arc<TransportHandle>>,
    heartbeat: Arc<RwLock<Option<DateTime<Utc>>>>,
    cancel: CancellationToken,
) {
    let mut schedule = TickSchedule::new(
        config.session.statistics_interval_ticks,
        config.session.heartbeat_interval_ticks,
    );
    let mut interval = tokio::time::interval(config.session.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    debug!("Session worker started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let (poll_statistics, beat) = schedule.advance();
        if poll_statistics {
            if let Err(e) = poller.poll().await {
                report_poll_failure(&e, schedule.statistics_every);
            }
        }
        if beat {
            *heartbeat.write().await = Some(Utc::now());
            debug!("Heartbeat");
        }
    }

    if let Some(transport) = transport {
        transport.terminate().await;
    }
    info!("Worker stopped...");
}
