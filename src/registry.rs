//! The set of running channels and the state they share.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{error, info};

use crate::channel::{AisChannel, ChannelError, ChannelSettings, ChannelStatus};
use crate::config::{Config, Properties};
use crate::directory::VesselDirectory;
use crate::trail::{ThinningPolicy, TrailPolicy};

/// Hands out channel ordinals in creation order, starting at 0.
#[derive(Debug, Default)]
pub struct OrdinalAllocator {
    next: AtomicU32,
}

impl OrdinalAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Owns all channels, their properties and the shared vessel directory.
pub struct ChannelRegistry {
    ordinals: OrdinalAllocator,
    directory: Arc<VesselDirectory>,
    policy: Arc<dyn TrailPolicy>,
    properties: Properties,
    throughput_interval: Duration,
    channels: Vec<AisChannel>,
}

impl ChannelRegistry {
    /// Build a registry with one (inactive) channel per configured id.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new(
            Arc::new(VesselDirectory::new(config.trail.max_points)),
            Arc::new(ThinningPolicy::from(&config.trail)),
            config.properties.clone(),
        );
        registry.throughput_interval = Duration::from_secs(config.throughput_interval);

        for ident in &config.channels {
            registry.add_channel(ident.clone());
        }
        registry
    }

    pub fn new(
        directory: Arc<VesselDirectory>,
        policy: Arc<dyn TrailPolicy>,
        properties: Properties,
    ) -> Self {
        Self {
            ordinals: OrdinalAllocator::new(),
            directory,
            policy,
            properties,
            throughput_interval: crate::channel::THROUGHPUT_INTERVAL,
            channels: Vec::new(),
        }
    }

    /// Add an inactive channel and return it.
    pub fn add_channel(&mut self, ident: impl Into<String>) -> &mut AisChannel {
        let channel = AisChannel::new(
            ident,
            self.ordinals.allocate(),
            Arc::clone(&self.directory),
            Arc::clone(&self.policy),
        )
        .with_throughput_interval(self.throughput_interval);

        self.channels.push(channel);
        let last = self.channels.len() - 1;
        &mut self.channels[last]
    }

    pub fn directory(&self) -> &Arc<VesselDirectory> {
        &self.directory
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn channels(&self) -> &[AisChannel] {
        &self.channels
    }

    pub fn get(&self, ident: &str) -> Option<&AisChannel> {
        self.channels.iter().find(|c| c.ident() == ident)
    }

    /// Activate a single channel by id.
    ///
    /// Returns `Ok(false)` if no channel has that id.
    pub async fn activate(&mut self, ident: &str) -> Result<bool, ChannelError> {
        let props = &self.properties;
        match self.channels.iter_mut().find(|c| c.ident() == ident) {
            Some(channel) => channel.activate(props).await.map(|()| true),
            None => Ok(false),
        }
    }

    /// Activate every channel. Failures are logged and skipped; returns the
    /// number of channels that started.
    pub async fn activate_all(&mut self) -> usize {
        let props = &self.properties;
        let mut started = 0;
        for channel in &mut self.channels {
            match channel.activate(props).await {
                Ok(()) => started += 1,
                Err(e) => error!("{}", e),
            }
        }
        info!("{} of {} AIS channels started", started, self.channels.len());
        started
    }

    /// Deactivate every channel, waiting for each feed to stop.
    pub async fn deactivate_all(&mut self) {
        for channel in &mut self.channels {
            channel.deactivate().await;
        }
    }

    /// Store new settings for a channel; they apply on next activation.
    pub fn update_settings(&mut self, ident: &str, settings: &ChannelSettings) -> bool {
        let props = &mut self.properties;
        match self.channels.iter().find(|c| c.ident() == ident) {
            Some(channel) => {
                channel.apply_settings(props, settings);
                true
            }
            None => false,
        }
    }

    /// Editable settings of a channel, read from the stored properties.
    pub fn settings(&self, ident: &str) -> Option<ChannelSettings> {
        self.get(ident)
            .map(|channel| channel.export_settings(&self.properties))
    }

    pub fn statuses(&self) -> Vec<ChannelStatus> {
        self.channels.iter().map(AisChannel::status).collect()
    }
}
