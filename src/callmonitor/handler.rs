//! Transport callbacks for the call monitor connection

use super::dispatcher::EventDispatcher;
use super::framer::LineFramer;
use super::parser::parse_line;
use crate::error::{classify_io_error, TransportErrorKind};
use crate::session::ConnectionState;
use crate::transport::TransportHandler;
use async_trait::async_trait;
use std::io;
use tokio::sync::watch;
use tracing::{error, info, trace};

/// Frames socket data into lines and dispatches the parsed events
///
/// The transport owns the handler and calls it from a single task, so the
/// line buffer is never fed concurrently.
pub struct CallMonitorHandler {
    framer: LineFramer,
    dispatcher: EventDispatcher,
    state: watch::Sender<ConnectionState>,
    endpoint: String,
}

impl CallMonitorHandler {
    pub fn new(
        framer: LineFramer,
        dispatcher: EventDispatcher,
        state: watch::Sender<ConnectionState>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            framer,
            dispatcher,
            state,
            endpoint: endpoint.into(),
        }
    }

    /// Feed raw socket data and dispatch every complete record
    pub async fn process(&mut self, data: &[u8]) {
        for line in self.framer.feed(data) {
            trace!("Call monitor line: {}", line);
            if let Some(event) = parse_line(&line) {
                self.dispatcher.dispatch(event).await;
            }
        }
    }
}

#[async_trait]
impl TransportHandler for CallMonitorHandler {
    async fn on_connecting(&mut self) {
        self.state.send_replace(ConnectionState::Connecting);
    }

    async fn on_connect(&mut self) {
        info!("connected to: {}", self.endpoint);
        self.framer.reset();
        self.state.send_replace(ConnectionState::Connected);
    }

    async fn on_disconnect(&mut self) {
        info!("disconnected");
        self.state.send_replace(ConnectionState::Disconnected);
    }

    async fn on_data(&mut self, data: &[u8]) {
        self.process(data).await;
    }

    async fn on_error(&mut self, error: &io::Error) {
        match classify_io_error(error) {
            TransportErrorKind::ConnectFailed => {
                error!("Can not connect to: {}", self.endpoint);
            }
            TransportErrorKind::ConnectionReset => info!("Connection reset!"),
            TransportErrorKind::Other => error!("{}", error),
        }
    }
}
