//! TCP feed client for decoded AIS reports.
//!
//! This module handles the TCP connection to an AIS feed server, splitting
//! the stream into lines and handing each line to a registered sink. Lost
//! connections are retried at a fixed interval until the feed is stopped.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delay between reconnection attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

/// Longest line accepted from the feed.
const MAX_LINE_LENGTH: usize = 1000;

/// Receives every line read from the feed, in order.
pub trait ReportSink: Send + Sync + 'static {
    fn accept(&self, line: &str);
}

/// Errors raised while setting up a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed address {host}:{port}")]
    InvalidAddress { host: String, port: u16 },

    #[error("no report handler registered")]
    NoHandler,

    #[error("feed already started")]
    AlreadyStarted,

    #[error("no async runtime available: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub host: String,

    pub port: u16,

    /// Delay between reconnection attempts.
    pub reconnect_interval: Duration,

    pub connect_timeout: Duration,

    /// Connection is considered stale after this long without a line.
    pub read_timeout: Duration,
}

impl FeedConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reconnect_interval: RECONNECT_INTERVAL,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(300),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reconnecting AIS feed subscription.
///
/// Lifecycle: [`AisFeed::new`], [`AisFeed::register_handler`],
/// [`AisFeed::start`], then [`AisFeed::stop`] and [`AisFeed::join`].
/// Dropping a started feed cancels it.
pub struct AisFeed {
    config: FeedConfig,
    sink: Option<Arc<dyn ReportSink>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AisFeed {
    /// Create a feed for the given server. Nothing is connected yet.
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        if config.host.trim().is_empty() || config.port == 0 {
            return Err(FeedError::InvalidAddress {
                host: config.host,
                port: config.port,
            });
        }

        Ok(Self {
            config,
            sink: None,
            cancel: CancellationToken::new(),
            task: None,
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn register_handler(&mut self, sink: Arc<dyn ReportSink>) {
        self.sink = Some(sink);
    }

    /// Spawn the connection loop on the current tokio runtime.
    pub fn start(&mut self) -> Result<(), FeedError> {
        if self.task.is_some() {
            return Err(FeedError::AlreadyStarted);
        }
        let sink = self.sink.clone().ok_or(FeedError::NoHandler)?;
        let handle = Handle::try_current()?;

        let config = self.config.clone();
        let cancel = self.cancel.clone();
        self.task = Some(handle.spawn(run_connection_loop(config, sink, cancel)));
        Ok(())
    }

    /// Signal the connection loop to stop. Does not wait.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Wait for the connection loop to finish.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        match self.task.take() {
            Some(task) => task.await,
            None => Ok(()),
        }
    }
}

impl Drop for AisFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run the main connection loop with auto-reconnect.
async fn run_connection_loop(
    config: FeedConfig,
    sink: Arc<dyn ReportSink>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect_and_stream(&config, sink.as_ref()) => match result {
                Ok(()) => info!("Connection to {} closed", config.addr()),
                Err(e) => error!("Connection to {} failed: {}", config.addr(), e),
            },
        }

        info!(
            "Reconnecting to {} in {} seconds...",
            config.addr(),
            config.reconnect_interval.as_secs()
        );
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_interval) => {}
        }
    }

    debug!("Feed {} stopped", config.addr());
}

/// Connect to the server and stream lines until disconnected.
async fn connect_and_stream(config: &FeedConfig, sink: &dyn ReportSink) -> Result<()> {
    let addr = config.addr();
    info!("Connecting to {}...", addr);

    let stream = timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .context("Connection timeout")?
        .context("Failed to connect")?;

    info!("Connected to {}", addr);

    let mut lines = FramedRead::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    loop {
        match timeout(config.read_timeout, lines.next()).await {
            Ok(Some(Ok(line))) => sink.accept(line.trim_end()),
            Ok(Some(Err(e))) => {
                // Over-long lines are skipped by the codec; keep reading
                warn!("Bad line from {}: {}", addr, e);
            }
            Ok(None) => return Ok(()),
            Err(_) => {
                warn!("Read timeout, connection to {} may be stale", addr);
                return Err(anyhow::anyhow!("Read timeout"));
            }
        }
    }
}
