//! Applying position fixes to vessels.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::directory::VesselDirectory;
use crate::report::PositionFix;
use crate::timestamp::reconcile;
use crate::trail::{FixSource, TrailPoint, TrailPolicy};
use crate::vessel::VesselRef;

/// km/h per tenth of a knot. Applied to knots, the stored speed is in
/// units of 10 km/h.
const SPEED_FACTOR: f64 = 0.1852;

/// What happened to a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOutcome {
    /// Coordinates out of range; the vessel was not touched.
    Rejected,
    /// Motion updated, but the trail policy declined the point.
    Skipped,
    /// Recorded in the trail and set as the current position.
    Recorded,
}

/// Convert a reported speed to the stored integer, -1 when unknown.
pub fn convert_speed(fix: &PositionFix) -> i32 {
    fix.speed_knots()
        .map(|sog| (sog * SPEED_FACTOR).round() as i32)
        .unwrap_or(-1)
}

/// Convert a reported heading to the stored course, -1 when unknown.
pub fn convert_course(fix: &PositionFix) -> i32 {
    fix.heading().map(i32::from).unwrap_or(-1)
}

/// Validates fixes and writes them to vessels.
#[derive(Debug, Clone)]
pub struct PositionUpdater {
    policy: Arc<dyn TrailPolicy>,
}

impl PositionUpdater {
    pub fn new(policy: Arc<dyn TrailPolicy>) -> Self {
        Self { policy }
    }

    /// Apply `fix` to `vessel`, using `now` as the arrival time.
    ///
    /// Speed and course are always updated for a valid fix. The position and
    /// trail only change when the trail policy accepts the point, in which
    /// case the directory is notified of the move.
    pub fn apply(
        &self,
        directory: &VesselDirectory,
        vessel: &VesselRef,
        fix: &PositionFix,
        source: FixSource,
        now: DateTime<Utc>,
    ) -> PositionOutcome {
        if !fix.has_valid_latitude() || !fix.has_valid_longitude() {
            debug!(
                "Ignoring position {},{} for MMSI:{}",
                fix.latitude,
                fix.longitude,
                vessel.read().id()
            );
            return PositionOutcome::Rejected;
        }

        let point = TrailPoint {
            time: reconcile(now, fix.utc_second),
            position: fix.position(),
            speed: convert_speed(fix),
            course: convert_course(fix),
            source,
        };

        let mut v = vessel.write();
        v.set_speed(point.speed);
        v.set_course(point.course);

        if !self.policy.should_record(v.trail().last(), &point) {
            return PositionOutcome::Skipped;
        }

        let time = point.time;
        let position = point.position;
        v.trail_mut().push(point);
        let previous = v.update_position(time, position);

        // Broadcast send never blocks
        directory.update_item(&v, previous);

        PositionOutcome::Recorded
    }
}
