//! Routing decoded reports to vessel updates.
//!
//! One dispatcher serves one channel. It is the error boundary for a single
//! report: whatever goes wrong with one line is logged and counted, and the
//! next line is processed as usual.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::channel::StateCell;
use crate::decoder::{DecodeError, JsonReportDecoder, ReportDecoder, looks_like_report};
use crate::directory::VesselDirectory;
use crate::feed::ReportSink;
use crate::position::PositionUpdater;
use crate::report::{AisReport, Mmsi, ReportBody, StaticData};
use crate::stats::ChannelStats;
use crate::trail::{FixSource, TrailPolicy};
use crate::vessel::VesselRef;

/// Errors that drop a single report.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cannot decode AIS message: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid MMSI {0} in message {1}")]
    InvalidMmsi(Mmsi, u8),
}

/// Applies reports from one channel to the shared directory.
pub struct Dispatcher {
    channel: String,
    channel_tag: Option<String>,
    directory: Arc<VesselDirectory>,
    positions: PositionUpdater,
    stats: Arc<ChannelStats>,
    state: Arc<StateCell>,
    decoder: Box<dyn ReportDecoder>,
}

impl Dispatcher {
    pub fn new(
        channel: impl Into<String>,
        directory: Arc<VesselDirectory>,
        policy: Arc<dyn TrailPolicy>,
        stats: Arc<ChannelStats>,
        state: Arc<StateCell>,
    ) -> Self {
        Self {
            channel: channel.into(),
            channel_tag: None,
            directory,
            positions: PositionUpdater::new(policy),
            stats,
            state,
            decoder: Box::new(JsonReportDecoder),
        }
    }

    /// Tag added to every vessel this channel creates.
    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.channel_tag = tag.filter(|t| !t.is_empty());
        self
    }

    pub fn with_decoder(mut self, decoder: Box<dyn ReportDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Process one raw feed line, logging instead of returning failures.
    pub fn handle_line(&self, line: &str) {
        if !looks_like_report(line) {
            self.stats.record_ignored();
            debug!("[{}] Non-report line: {}", self.channel, line);
            return;
        }

        match self.process_line(line) {
            Ok(()) => {
                if self.state.mark_running() {
                    debug!("[{}] First report processed, channel running", self.channel);
                }
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(channel = %self.channel, "Dropping AIS message: {}", e);
            }
        }
    }

    fn process_line(&self, line: &str) -> Result<(), DispatchError> {
        let report = self.decoder.decode(line)?;
        self.dispatch(&report)
    }

    /// Apply a report using the current time as arrival time.
    pub fn dispatch(&self, report: &AisReport) -> Result<(), DispatchError> {
        self.dispatch_at(report, Utc::now())
    }

    /// Apply a report that arrived at `now`.
    pub fn dispatch_at(&self, report: &AisReport, now: DateTime<Utc>) -> Result<(), DispatchError> {
        self.stats.record_message();

        if report.mmsi == 0 {
            return Err(DispatchError::InvalidMmsi(report.mmsi, report.kind));
        }

        let vessel = self.resolve(report.mmsi);

        match &report.body {
            ReportBody::PositionA { fix, nav_status } => {
                self.positions
                    .apply(&self.directory, &vessel, fix, FixSource::Ais, now);
                if let Some(status) = nav_status {
                    vessel.write().set_nav_status(*status);
                }
            }
            ReportBody::Static { data } => {
                self.apply_static(&vessel, report.mmsi, data);
            }
            ReportBody::PositionB { fix } => {
                self.positions
                    .apply(&self.directory, &vessel, fix, FixSource::Ais, now);
            }
            ReportBody::ExtendedB { fix, data } => {
                self.apply_static(&vessel, report.mmsi, data);
                self.positions
                    .apply(&self.directory, &vessel, fix, FixSource::Ais, now);
            }
            ReportBody::LongRange { fix } => {
                self.positions
                    .apply(&self.directory, &vessel, fix, FixSource::AisLongRange, now);
            }
            ReportBody::Other => {}
        }

        Ok(())
    }

    fn resolve(&self, mmsi: Mmsi) -> VesselRef {
        let (vessel, created) = self
            .directory
            .get_or_create(mmsi, self.channel_tag.as_deref());
        if created {
            self.stats.record_vessel_created();
        }
        vessel.write().set_source_channel(&self.channel);
        vessel
    }

    fn apply_static(&self, vessel: &VesselRef, mmsi: Mmsi, data: &StaticData) {
        debug!(
            "[{}] Static: mmsi={}, type={}, callsign={:?}, name={:?}",
            self.channel, mmsi, data.ship_type, data.callsign, data.name
        );
        vessel.write().apply_static(data);
    }
}

impl ReportSink for Dispatcher {
    fn accept(&self, line: &str) {
        self.handle_line(line);
    }
}
