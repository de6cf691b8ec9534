//! AIS channel lifecycle.
//!
//! A channel ties one feed subscription to one dispatcher and tracks the
//! lifecycle `OFF -> STARTING -> RUNNING`. The channel moves to RUNNING when
//! the first report has been processed, and back to OFF on deactivation or
//! when activation fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{DEFAULT_HOST, DEFAULT_PORT, Properties, channel_key};
use crate::directory::VesselDirectory;
use crate::dispatcher::Dispatcher;
use crate::feed::{AisFeed, FeedConfig, FeedError, RECONNECT_INTERVAL};
use crate::stats::ChannelStats;
use crate::trail::TrailPolicy;

/// Channel type name used in status exports.
pub const CHANNEL_KIND: &str = "AIS-TCP";

/// Port shown by [`AisChannel::export_settings`] when none is configured.
pub const EXPORT_DEFAULT_PORT: u16 = 21;

/// Default interval between throughput log lines.
pub const THROUGHPUT_INTERVAL: Duration = Duration::from_secs(120);

/// Shortest accepted interval between throughput log lines.
pub const MIN_THROUGHPUT_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ChannelState {
    Off = 0,
    Starting = 1,
    Running = 2,
}

impl ChannelState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            _ => Self::Off,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Off => write!(f, "OFF"),
            ChannelState::Starting => write!(f, "STARTING"),
            ChannelState::Running => write!(f, "RUNNING"),
        }
    }
}

/// Channel state shared between the channel and its feed task.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ChannelState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ChannelState {
        ChannelState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ChannelState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move STARTING to RUNNING. Returns true if this call made the change.
    pub fn mark_running(&self) -> bool {
        self.0
            .compare_exchange(
                ChannelState::Starting as u8,
                ChannelState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Errors raised by channel lifecycle operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to activate AIS channel {ident}: {source}")]
    Activation {
        ident: String,
        #[source]
        source: FeedError,
    },
}

/// Editable channel settings, as exchanged with a management surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Read-only view of a channel for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub ident: String,
    pub kind: &'static str,
    pub short_descr: String,
    pub state: ChannelState,
    pub host: String,
    pub port: u16,
    pub messages: u64,
    pub vessels: u64,
}

/// Sets the channel OFF when dropped, even if deactivation is abandoned
/// halfway through.
struct OffOnDrop(Arc<StateCell>);

impl Drop for OffOnDrop {
    fn drop(&mut self) {
        self.0.set(ChannelState::Off);
    }
}

/// Background task logging channel throughput. Dropping it cancels the task.
struct ThroughputLogger {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ThroughputLogger {
    fn spawn(ident: String, stats: Arc<ChannelStats>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => info!(channel = %ident, "{}", stats.summary()),
                }
            }
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ThroughputLogger {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// An AIS channel reading decoded reports over TCP.
pub struct AisChannel {
    ident: String,
    ordinal: u32,
    host: String,
    port: u16,
    tag: Option<String>,
    state: Arc<StateCell>,
    stats: Arc<ChannelStats>,
    directory: Arc<VesselDirectory>,
    policy: Arc<dyn TrailPolicy>,
    throughput_interval: Duration,
    feed: Option<AisFeed>,
    logger: Option<ThroughputLogger>,
}

impl AisChannel {
    /// Create an inactive channel. `ordinal` gives the short name `ais<n>`.
    pub fn new(
        ident: impl Into<String>,
        ordinal: u32,
        directory: Arc<VesselDirectory>,
        policy: Arc<dyn TrailPolicy>,
    ) -> Self {
        Self {
            ident: ident.into(),
            ordinal,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tag: None,
            state: Arc::new(StateCell::new(ChannelState::Off)),
            stats: Arc::new(ChannelStats::new()),
            directory,
            policy,
            throughput_interval: THROUGHPUT_INTERVAL,
            feed: None,
            logger: None,
        }
    }

    /// Set the throughput log interval, at least [`MIN_THROUGHPUT_INTERVAL`].
    pub fn with_throughput_interval(mut self, interval: Duration) -> Self {
        self.throughput_interval = interval.max(MIN_THROUGHPUT_INTERVAL);
        self
    }

    pub fn throughput_interval(&self) -> Duration {
        self.throughput_interval
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn short_descr(&self) -> String {
        format!("ais{}", self.ordinal)
    }

    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    pub fn stats(&self) -> &Arc<ChannelStats> {
        &self.stats
    }

    pub fn state_cell(&self) -> &Arc<StateCell> {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.feed.is_some()
    }

    /// Reload host, port and tag from the channel's properties.
    fn load_config(&mut self, props: &Properties) {
        self.host = props.get_property(&channel_key(&self.ident, "host"), DEFAULT_HOST);
        self.port = props.get_int_property(&channel_key(&self.ident, "port"), DEFAULT_PORT);
        self.tag = props
            .get(&channel_key(&self.ident, "tag"))
            .filter(|t| !t.is_empty())
            .map(str::to_string);
    }

    /// Write `settings` into `props`; they take effect on next activation.
    pub fn apply_settings(&self, props: &mut Properties, settings: &ChannelSettings) {
        props.set_property(channel_key(&self.ident, "host"), &settings.host);
        props.set_property(channel_key(&self.ident, "port"), settings.port);
        if let Some(tag) = &settings.tag {
            props.set_property(channel_key(&self.ident, "tag"), tag);
        }
    }

    /// Settings as stored in `props`, for editing.
    ///
    /// Unlike activation, an unset port reads as [`EXPORT_DEFAULT_PORT`].
    pub fn export_settings(&self, props: &Properties) -> ChannelSettings {
        ChannelSettings {
            host: props.get_property(&channel_key(&self.ident, "host"), DEFAULT_HOST),
            port: props.get_int_property(&channel_key(&self.ident, "port"), EXPORT_DEFAULT_PORT),
            tag: props
                .get(&channel_key(&self.ident, "tag"))
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }

    pub fn settings(&self) -> ChannelSettings {
        ChannelSettings {
            host: self.host.clone(),
            port: self.port,
            tag: self.tag.clone(),
        }
    }

    pub fn status(&self) -> ChannelStatus {
        ChannelStatus {
            ident: self.ident.clone(),
            kind: CHANNEL_KIND,
            short_descr: self.short_descr(),
            state: self.state(),
            host: self.host.clone(),
            port: self.port,
            messages: self.stats.messages(),
            vessels: self.stats.vessels(),
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.ident.clone(),
            Arc::clone(&self.directory),
            Arc::clone(&self.policy),
            Arc::clone(&self.stats),
            Arc::clone(&self.state),
        )
        .with_tag(self.tag.clone())
    }

    fn open_feed(&self) -> Result<AisFeed, FeedError> {
        let mut config = FeedConfig::new(self.host.clone(), self.port);
        config.reconnect_interval = RECONNECT_INTERVAL;

        let mut feed = AisFeed::new(config)?;
        feed.register_handler(Arc::new(self.dispatcher()));
        // A feed that fails to start is dropped here, which cancels it
        feed.start()?;
        Ok(feed)
    }

    /// Start the channel.
    ///
    /// Returns as soon as the feed task is spawned; connecting happens in
    /// the background. An already active channel is restarted with the
    /// current properties.
    pub async fn activate(&mut self, props: &Properties) -> Result<(), ChannelError> {
        if self.is_active() {
            self.deactivate().await;
        }

        self.load_config(props);
        info!(
            "[{}] Activating AIS channel: {} ({}:{})",
            self.short_descr(),
            self.ident,
            self.host,
            self.port
        );

        // Set before the feed starts so the first report can move it on
        self.state.set(ChannelState::Starting);

        match self.open_feed() {
            Ok(feed) => {
                self.feed = Some(feed);
                self.logger = Some(ThroughputLogger::spawn(
                    self.ident.clone(),
                    Arc::clone(&self.stats),
                    self.throughput_interval,
                ));
                Ok(())
            }
            Err(source) => {
                self.state.set(ChannelState::Off);
                error!(
                    "[{}] Failed to activate AIS channel {}: {}",
                    self.short_descr(),
                    self.ident,
                    source
                );
                Err(ChannelError::Activation {
                    ident: self.ident.clone(),
                    source,
                })
            }
        }
    }

    /// Stop the channel and wait for its feed task to finish.
    ///
    /// Does nothing if the channel is not active. The channel ends up OFF
    /// even if the feed task ended abnormally or this future is dropped
    /// before completion.
    pub async fn deactivate(&mut self) {
        let Some(mut feed) = self.feed.take() else {
            return;
        };
        let _off = OffOnDrop(Arc::clone(&self.state));

        info!(
            "[{}] Deactivating AIS channel: {}",
            self.short_descr(),
            self.ident
        );
        feed.stop();

        if let Some(mut logger) = self.logger.take() {
            logger.stop().await;
        }

        if let Err(e) = feed.join().await {
            warn!(
                "[{}] Interrupted while stopping AIS channel {}: {}",
                self.short_descr(),
                self.ident,
                e
            );
        }
    }
}

impl fmt::Display for AisChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AIS TCP Channel {}", self.ident)
    }
}
