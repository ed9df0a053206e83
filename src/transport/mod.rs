//! TCP transport for the call monitor socket
//!
//! A single background task owns the socket. It connects, reports
//! lifecycle changes and received bytes to a [`TransportHandler`], forwards
//! queued writes, and reconnects after a fixed delay when the connection
//! fails or drops.

use crate::error::{FritzboxError, Result};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Callbacks invoked by the transport task
///
/// Calls are made one at a time from the transport task, never
/// concurrently.
#[async_trait]
pub trait TransportHandler: Send {
    /// A connection attempt is about to start
    async fn on_connecting(&mut self) {}

    /// The socket is connected
    async fn on_connect(&mut self);

    /// An established connection has ended
    async fn on_disconnect(&mut self);

    /// Bytes arrived on the socket
    async fn on_data(&mut self, data: &[u8]);

    /// A connect, read or write failed
    async fn on_error(&mut self, error: &io::Error);
}

/// Transport settings
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub retry_delay: Duration,
    pub read_buffer_size: usize,
}

impl TransportConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    Lost,
    Terminated,
}

/// Handle to a running transport task
pub struct TransportHandle {
    writer: mpsc::UnboundedSender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TransportHandle {
    /// Spawn the transport task and start connecting
    pub fn connect<H>(config: TransportConfig, handler: H) -> Self
    where
        H: TransportHandler + 'static,
    {
        let (writer, write_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            config,
            handler,
            write_rx,
            connected.clone(),
            cancel.clone(),
        ));

        Self {
            writer,
            connected,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Whether the socket is currently connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue bytes for the router
    pub fn write(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        if !self.is_connected() {
            return Err(FritzboxError::connection("call monitor is not connected"));
        }
        self.writer
            .send(data.into())
            .map_err(|_| FritzboxError::connection("transport task has stopped"))
    }

    /// Close the connection and wait for the transport task to exit
    pub async fn terminate(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Transport task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<H: TransportHandler>(
    config: TransportConfig,
    mut handler: H,
    mut write_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let endpoint = config.endpoint();

    loop {
        handler.on_connecting().await;
        debug!("Connecting to {}", endpoint);

        let attempt = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&endpoint));
        let stream = tokio::select! {
            _ = cancel.cancelled() => break,
            result = attempt => match result {
                Ok(Ok(stream)) => Some(stream),
                Ok(Err(e)) => {
                    handler.on_error(&e).await;
                    None
                }
                Err(_) => {
                    let e = io::Error::new(io::ErrorKind::TimedOut, "connect timed out");
                    handler.on_error(&e).await;
                    None
                }
            },
        };

        if let Some(stream) = stream {
            // Writes queued for an earlier connection are stale
            while write_rx.try_recv().is_ok() {}

            connected.store(true, Ordering::SeqCst);
            handler.on_connect().await;
            let end = pump(
                stream,
                &mut handler,
                &mut write_rx,
                &cancel,
                config.read_buffer_size,
            )
            .await;
            connected.store(false, Ordering::SeqCst);
            handler.on_disconnect().await;

            if end == ConnectionEnd::Terminated {
                break;
            }
        }

        debug!("Reconnecting to {} in {:?}", endpoint, config.retry_delay);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.retry_delay) => {}
        }
    }

    connected.store(false, Ordering::SeqCst);
}

async fn pump<H: TransportHandler>(
    stream: TcpStream,
    handler: &mut H,
    write_rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
    cancel: &CancellationToken,
    read_buffer_size: usize,
) -> ConnectionEnd {
    let (mut reader, mut writer) = stream.into_split();
    let mut buffer = vec![0u8; read_buffer_size.max(1)];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = writer.shutdown().await {
                    debug!("Socket shutdown failed: {}", e);
                }
                return ConnectionEnd::Terminated;
            }
            read = reader.read(&mut buffer) => match read {
                Ok(0) => {
                    handler.on_error(&io::Error::from(io::ErrorKind::UnexpectedEof)).await;
                    return ConnectionEnd::Lost;
                }
                Ok(n) => handler.on_data(&buffer[..n]).await,
                Err(e) => {
                    handler.on_error(&e).await;
                    return ConnectionEnd::Lost;
                }
            },
            Some(data) = write_rx.recv() => {
                if let Err(e) = writer.write_all(&data).await {
                    handler.on_error(&e).await;
                    return ConnectionEnd::Lost;
                }
            }
        }
    }
}
