//! Concurrent directory of tracked vessels.
//!
//! The directory is shared by every channel. Lookups and inserts go through
//! a [`DashMap`] entry so that two channels hearing the same vessel for the
//! first time at once still produce a single record.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::classify::BASE_TAG;
use crate::report::{LatLng, Mmsi};
use crate::vessel::{Vessel, VesselRef};

/// Capacity of the movement notification channel.
const MOVE_CHANNEL_CAPACITY: usize = 1024;

/// Notification that a vessel's recorded position changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselMoved {
    pub mmsi: Mmsi,
    pub previous: Option<LatLng>,
    pub current: LatLng,
    pub time: DateTime<Utc>,
}

/// Directory of all vessels seen on any channel.
#[derive(Debug)]
pub struct VesselDirectory {
    vessels: DashMap<Mmsi, VesselRef>,
    trail_capacity: usize,
    moves: broadcast::Sender<VesselMoved>,
}

impl VesselDirectory {
    /// Create an empty directory whose vessels keep at most
    /// `trail_capacity` trail points.
    pub fn new(trail_capacity: usize) -> Self {
        let (moves, _) = broadcast::channel(MOVE_CHANNEL_CAPACITY);
        Self {
            vessels: DashMap::new(),
            trail_capacity,
            moves,
        }
    }

    pub fn get(&self, mmsi: Mmsi) -> Option<VesselRef> {
        self.vessels.get(&mmsi).map(|v| v.value().clone())
    }

    /// Look up a vessel, creating it if this is the first report for `mmsi`.
    ///
    /// New vessels start with a hidden label and the [`BASE_TAG`], plus
    /// `channel_tag` when given. The boolean is true only for the caller
    /// whose insert actually created the record.
    pub fn get_or_create(&self, mmsi: Mmsi, channel_tag: Option<&str>) -> (VesselRef, bool) {
        match self.vessels.entry(mmsi) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let mut vessel = Vessel::new(mmsi, self.trail_capacity);
                vessel.add_tag(BASE_TAG);
                if let Some(tag) = channel_tag.filter(|t| !t.is_empty()) {
                    vessel.add_tag(tag);
                }
                vessel.set_label_hidden(true);

                debug!("New vessel MMSI:{}", mmsi);
                let vessel = entry.insert(VesselRef::new(vessel)).value().clone();
                (vessel, true)
            }
        }
    }

    /// Announce that `vessel` moved from `previous`.
    pub fn update_item(&self, vessel: &Vessel, previous: Option<LatLng>) {
        let Some(current) = vessel.position() else {
            return;
        };
        let event = VesselMoved {
            mmsi: vessel.id(),
            previous,
            current,
            time: vessel.last_updated().unwrap_or_else(Utc::now),
        };
        // No subscribers is fine
        let _ = self.moves.send(event);
    }

    /// Receive future [`VesselMoved`] notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<VesselMoved> {
        self.moves.subscribe()
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    /// Clone the state of every vessel, ordered by MMSI.
    pub fn snapshot(&self) -> Vec<Vessel> {
        let mut vessels: Vec<_> = self.vessels.iter().map(|v| v.value().snapshot()).collect();
        vessels.sort_by_key(Vessel::id);
        vessels
    }
}

impl Default for VesselDirectory {
    fn default() -> Self {
        Self::new(crate::config::TrailConfig::default().max_points)
    }
}
