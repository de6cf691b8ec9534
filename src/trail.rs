//! Bounded per-vessel position history.
//!
//! The trail keeps the most recent recorded fixes of a vessel. Whether a new
//! fix is worth recording is decided by a [`TrailPolicy`]; the default
//! [`ThinningPolicy`] drops fixes that neither moved the vessel nor
//! advanced time meaningfully since the last recorded one.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

use crate::config::TrailConfig;
use crate::report::LatLng;

/// Origin marker stored with each trail point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixSource {
    /// Standard class A/B position report.
    Ais,
    /// Reduced-precision long-range report (kind 27).
    AisLongRange,
}

impl fmt::Display for FixSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixSource::Ais => write!(f, "AIS"),
            FixSource::AisLongRange => write!(f, "AIS-LR"),
        }
    }
}

/// A recorded fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailPoint {
    pub time: DateTime<Utc>,
    pub position: LatLng,
    /// Stored speed (knots x 0.1852, rounded), -1 when unknown.
    pub speed: i32,
    /// Course in degrees, -1 when unknown.
    pub course: i32,
    pub source: FixSource,
}

/// Decides whether a candidate fix should be appended to a trail.
pub trait TrailPolicy: Send + Sync + fmt::Debug {
    fn should_record(&self, last: Option<&TrailPoint>, candidate: &TrailPoint) -> bool;
}

/// Records a fix when the vessel moved far enough or enough time passed.
#[derive(Debug, Clone)]
pub struct ThinningPolicy {
    /// Minimum displacement from the last recorded fix, in meters.
    pub min_distance_m: f64,

    /// A fix is recorded regardless of displacement after this long.
    pub max_interval: Duration,
}

impl Default for ThinningPolicy {
    fn default() -> Self {
        Self::from(&TrailConfig::default())
    }
}

impl From<&TrailConfig> for ThinningPolicy {
    fn from(config: &TrailConfig) -> Self {
        Self {
            min_distance_m: config.min_distance_m,
            max_interval: i64::try_from(config.max_interval_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }
}

impl TrailPolicy for ThinningPolicy {
    fn should_record(&self, last: Option<&TrailPoint>, candidate: &TrailPoint) -> bool {
        let Some(last) = last else {
            return true;
        };

        // Out-of-order fixes would break the trail ordering
        if candidate.time < last.time {
            return false;
        }

        candidate.position.distance_m(&last.position) > self.min_distance_m
            || candidate.time - last.time >= self.max_interval
    }
}

/// Ordered, bounded history of recorded fixes. Oldest points are evicted
/// first once `max_points` is reached.
#[derive(Debug, Clone, Serialize)]
pub struct Trail {
    points: VecDeque<TrailPoint>,
    #[serde(skip)]
    max_points: usize,
}

impl Trail {
    pub fn new(max_points: usize) -> Self {
        Self {
            points: VecDeque::new(),
            max_points: max_points.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TrailPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }

    pub fn push(&mut self, point: TrailPoint) {
        while self.points.len() >= self.max_points {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }
}
