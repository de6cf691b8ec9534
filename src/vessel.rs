//! The tracked vessel entity and its merge rules.
//!
//! Vessel state is assembled from many partial reports. Identity fields are
//! merged without erasing: an empty incoming name or callsign never replaces
//! a known one, a zero ship type never replaces a known type, and tags only
//! accumulate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::classify::{classify, nav_status_text};
use crate::report::{LatLng, Mmsi, StaticData};
use crate::trail::Trail;

/// A vessel known to the directory.
#[derive(Debug, Clone, Serialize)]
pub struct Vessel {
    id: Mmsi,
    name: Option<String>,
    callsign: Option<String>,
    type_code: u8,
    type_text: &'static str,
    tags: BTreeSet<String>,
    nav_status: i16,
    position: Option<LatLng>,
    last_updated: Option<DateTime<Utc>>,
    speed: i32,
    course: i32,
    source_channel: Option<String>,
    label_hidden: bool,
    trail: Trail,
}

impl Vessel {
    /// Create an unclassified vessel with a hidden label.
    pub fn new(id: Mmsi, trail_capacity: usize) -> Self {
        Self {
            id,
            name: None,
            callsign: None,
            type_code: 0,
            type_text: classify(0).description,
            tags: BTreeSet::new(),
            nav_status: -1,
            position: None,
            last_updated: None,
            speed: -1,
            course: -1,
            source_channel: None,
            label_hidden: true,
            trail: Trail::new(trail_capacity),
        }
    }

    pub fn id(&self) -> Mmsi {
        self.id
    }

    /// Directory identifier, e.g. `MMSI:257123450`.
    pub fn ident(&self) -> String {
        format!("MMSI:{}", self.id)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn callsign(&self) -> Option<&str> {
        self.callsign.as_deref()
    }

    /// Set the name unless `name` is empty after trimming.
    pub fn set_name(&mut self, name: Option<&str>) {
        if let Some(name) = name.and_then(clean_text) {
            self.name = Some(name);
        }
    }

    /// Set the callsign unless `callsign` is empty after trimming.
    pub fn set_callsign(&mut self, callsign: Option<&str>) {
        if let Some(callsign) = callsign.and_then(clean_text) {
            self.callsign = Some(callsign);
        }
    }

    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    pub fn type_text(&self) -> &'static str {
        self.type_text
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn nav_status(&self) -> i16 {
        self.nav_status
    }

    pub fn nav_status_text(&self) -> &'static str {
        nav_status_text(self.nav_status)
    }

    pub fn set_nav_status(&mut self, status: u8) {
        self.nav_status = i16::from(status);
    }

    pub fn position(&self) -> Option<LatLng> {
        self.position
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Move the vessel, returning the previous position.
    pub fn update_position(&mut self, time: DateTime<Utc>, position: LatLng) -> Option<LatLng> {
        self.last_updated = Some(time);
        self.position.replace(position)
    }

    /// Stored speed (knots x 0.1852, rounded), -1 when unknown.
    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: i32) {
        self.speed = speed;
    }

    /// Course in degrees, -1 when unknown.
    pub fn course(&self) -> i32 {
        self.course
    }

    pub fn set_course(&mut self, course: i32) {
        self.course = course;
    }

    pub fn source_channel(&self) -> Option<&str> {
        self.source_channel.as_deref()
    }

    pub fn set_source_channel(&mut self, channel: &str) {
        if self.source_channel.as_deref() != Some(channel) {
            self.source_channel = Some(channel.to_string());
        }
    }

    pub fn label_hidden(&self) -> bool {
        self.label_hidden
    }

    pub fn set_label_hidden(&mut self, hidden: bool) {
        self.label_hidden = hidden;
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn trail_mut(&mut self) -> &mut Trail {
        &mut self.trail
    }

    /// Merge static/voyage data into this vessel.
    pub fn apply_static(&mut self, data: &StaticData) {
        if data.ship_type != 0 {
            let class = classify(data.ship_type);
            self.type_code = data.ship_type;
            self.type_text = class.description;
            if let Some(tag) = class.tag {
                self.add_tag(tag.as_str());
            }
        }
        self.set_name(data.name.as_deref());
        self.set_callsign(data.callsign.as_deref());
        self.label_hidden = false;
    }

    /// Name, then callsign, then the MMSI ident.
    pub fn display_id(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.callsign.clone())
            .unwrap_or_else(|| self.ident())
    }

    pub fn description(&self) -> String {
        match &self.callsign {
            Some(callsign) => format!("{}, {}", callsign, self.type_text),
            None => self.type_text.to_string(),
        }
    }
}

/// Strip AIS `@` padding and whitespace; `None` if nothing remains.
fn clean_text(text: &str) -> Option<String> {
    let text = text.trim_end_matches('@').trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Shared handle to a vessel stored in the directory.
///
/// Lock poisoning is ignored.
#[derive(Debug, Clone)]
pub struct VesselRef(Arc<RwLock<Vessel>>);

impl VesselRef {
    pub fn new(vessel: Vessel) -> Self {
        Self(Arc::new(RwLock::new(vessel)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vessel> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vessel> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the current vessel state.
    pub fn snapshot(&self) -> Vessel {
        self.read().clone()
    }

    pub fn ptr_eq(&self, other: &VesselRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_static(name: &str, callsign: &str, ship_type: u8) -> StaticData {
        StaticData {
            name: Some(name.to_string()),
            callsign: Some(callsign.to_string()),
            ship_type,
        }
    }

    #[test]
    fn test_new_vessel_defaults() {
        let v = Vessel::new(257_123_450, 10);
        assert_eq!(v.ident(), "MMSI:257123450");
        assert!(v.label_hidden());
        assert_eq!(v.nav_status(), -1);
        assert_eq!(v.speed(), -1);
        assert_eq!(v.course(), -1);
        assert_eq!(v.type_code(), 0);
        assert_eq!(v.type_text(), "Undefined");
        assert!(v.position().is_none());
        assert_eq!(v.display_id(), "MMSI:257123450");
    }

    #[test]
    fn test_non_erasing_merge() {
        let mut v = Vessel::new(1, 10);
        v.apply_static(&make_static("TESTSHIP", "ABCD", 30));
        v.apply_static(&make_static("", "   ", 0));
        v.apply_static(&StaticData::default());

        assert_eq!(v.name(), Some("TESTSHIP"));
        assert_eq!(v.callsign(), Some("ABCD"));
        assert_eq!(v.type_code(), 30);
        assert_eq!(v.type_text(), "Fishing");
    }

    #[test]
    fn test_padding_is_stripped() {
        let mut v = Vessel::new(1, 10);
        v.apply_static(&make_static("NORDLYS@@@@@@", "LHCW@@@", 60));
        assert_eq!(v.name(), Some("NORDLYS"));
        assert_eq!(v.callsign(), Some("LHCW"));

        v.set_name(Some("@@@@@@@@"));
        assert_eq!(v.name(), Some("NORDLYS"));
    }

    #[test]
    fn test_tags_accumulate() {
        let mut v = Vessel::new(1, 10);
        v.add_tag("AIS");
        v.apply_static(&make_static("A", "B", 51));
        v.apply_static(&make_static("A", "B", 72));
        v.apply_static(&make_static("A", "B", 37));

        assert!(v.has_tag("AIS"));
        assert!(v.has_tag("AIS.SAR"));
        assert!(v.has_tag("AIS.cargo"));
        assert_eq!(v.tags().len(), 3);
        assert_eq!(v.type_text(), "Recreational");
    }

    #[test]
    fn test_static_clears_hidden_label() {
        let mut v = Vessel::new(1, 10);
        v.apply_static(&StaticData::default());
        assert!(!v.label_hidden());
    }

    #[test]
    fn test_display_and_description() {
        let mut v = Vessel::new(1, 10);
        v.set_callsign(Some("LHCW"));
        assert_eq!(v.display_id(), "LHCW");
        assert_eq!(v.description(), "LHCW, Undefined");

        v.apply_static(&make_static("NORDLYS", "", 60));
        assert_eq!(v.display_id(), "NORDLYS");
        assert_eq!(v.description(), "LHCW, Passenger");
    }

    #[test]
    fn test_update_position_returns_previous() {
        let mut v = Vessel::new(1, 10);
        let now = Utc::now();
        assert_eq!(v.update_position(now, LatLng::new(60.0, 5.0)), None);
        assert_eq!(
            v.update_position(now, LatLng::new(61.0, 5.0)),
            Some(LatLng::new(60.0, 5.0))
        );
        assert_eq!(v.last_updated(), Some(now));
    }

    #[test]
    fn test_vessel_ref_shares_state() {
        let a = VesselRef::new(Vessel::new(1, 10));
        let b = a.clone();
        b.write().set_name(Some("SHARED"));
        assert_eq!(a.read().name(), Some("SHARED"));
        assert!(a.ptr_eq(&b));
        assert_eq!(a.snapshot().name(), Some("SHARED"));
    }
}
