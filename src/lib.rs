//! AIS Tracker - A Rust library and server for tracking vessels from AIS feeds.
//!
//! This crate provides:
//! - A reconnecting TCP feed client for decoded AIS reports
//! - Per-report dispatch with non-erasing merges into a shared vessel directory
//! - Timestamp reconciliation for fixes that only carry seconds-of-minute
//! - Ship type classification and bounded position trails
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ais_tracker::{
//!     ChannelState, ChannelStats, Dispatcher, StateCell, ThinningPolicy, VesselDirectory,
//! };
//!
//! let directory = Arc::new(VesselDirectory::default());
//! let dispatcher = Dispatcher::new(
//!     "ais1",
//!     Arc::clone(&directory),
//!     Arc::new(ThinningPolicy::default()),
//!     Arc::new(ChannelStats::new()),
//!     Arc::new(StateCell::new(ChannelState::Starting)),
//! );
//!
//! dispatcher.handle_line(r#"{"msgId":5,"mmsi":257123450,"name":"TESTSHIP","shipType":30}"#);
//!
//! let vessel = directory.get(257_123_450).expect("vessel created");
//! assert_eq!(vessel.read().type_text(), "Fishing");
//! ```

pub mod channel;
pub mod classify;
pub mod config;
pub mod decoder;
pub mod directory;
pub mod dispatcher;
pub mod feed;
pub mod metrics;
pub mod position;
pub mod registry;
pub mod report;
pub mod stats;
pub mod timestamp;
pub mod trail;
pub mod vessel;

pub use channel::{AisChannel, ChannelError, ChannelSettings, ChannelState, ChannelStatus, StateCell};
pub use classify::{BASE_TAG, Classification, Tag, classify, nav_status_text};
pub use config::{Config, Properties, TrailConfig};
pub use decoder::{DecodeError, JsonReportDecoder, ReportDecoder, decode_report};
pub use directory::{VesselDirectory, VesselMoved};
pub use dispatcher::{DispatchError, Dispatcher};
pub use feed::{AisFeed, FeedConfig, FeedError, ReportSink};
pub use position::{PositionOutcome, PositionUpdater};
pub use registry::{ChannelRegistry, OrdinalAllocator};
pub use report::{AisReport, LatLng, Mmsi, PositionFix, ReportBody, StaticData};
pub use stats::{ChannelStats, ThroughputSummary};
pub use timestamp::reconcile;
pub use trail::{FixSource, ThinningPolicy, Trail, TrailPoint, TrailPolicy};
pub use vessel::{Vessel, VesselRef};
