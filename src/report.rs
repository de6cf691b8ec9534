//! Data structures representing decoded AIS reports.
//!
//! This module defines the closed set of report shapes the pipeline
//! understands. Reports arrive already decoded from the wire format; see
//! [`crate::decoder`] for how a feed line becomes an [`AisReport`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maritime Mobile Service Identity, the numeric vessel key.
pub type Mmsi = u32;

/// Speed over ground value meaning "not available" (tenths of knots 1023).
const SOG_NOT_AVAILABLE: f64 = 102.3;

/// Mean earth radius in meters, used for haversine distances.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A geographic coordinate in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_m(&self, other: &LatLng) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// Position and motion carried by every position-bearing report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in decimal degrees. 91 means "not available".
    pub latitude: f64,

    /// Longitude in decimal degrees. 181 means "not available".
    pub longitude: f64,

    /// Speed over ground in knots, as reported.
    pub speed_over_ground: Option<f64>,

    /// True heading in degrees. 511 means "not available".
    pub true_heading: Option<u16>,

    /// Second of the UTC minute when the fix was taken (0-59, 60+ = n/a).
    pub utc_second: Option<u8>,
}

impl PositionFix {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    pub fn has_valid_latitude(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
    }

    pub fn has_valid_longitude(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude)
    }

    /// Speed over ground in knots, if the report carries a usable value.
    pub fn speed_knots(&self) -> Option<f64> {
        self.speed_over_ground
            .filter(|sog| sog.is_finite() && *sog >= 0.0 && *sog < SOG_NOT_AVAILABLE)
    }

    /// True heading in degrees, if the report carries a usable value.
    pub fn heading(&self) -> Option<u16> {
        self.true_heading.filter(|hdg| *hdg < 360)
    }
}

/// Identity and classification fields from static and voyage reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticData {
    pub name: Option<String>,
    pub callsign: Option<String>,
    /// Ship and cargo type code (0 = not available).
    pub ship_type: u8,
}

/// The kind-specific payload of a report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportBody {
    /// Kinds 1, 2 and 3: class A position report with navigational status.
    PositionA {
        fix: PositionFix,
        nav_status: Option<u8>,
    },

    /// Kinds 5 and 24: static and voyage related data.
    Static { data: StaticData },

    /// Kind 18: standard class B position report.
    PositionB { fix: PositionFix },

    /// Kind 19: extended class B report, position plus static data.
    ExtendedB { fix: PositionFix, data: StaticData },

    /// Kind 27: long-range broadcast with reduced precision.
    LongRange { fix: PositionFix },

    /// Any kind the pipeline does not act on.
    Other,
}

/// A single decoded AIS report.
#[derive(Debug, Clone, PartialEq)]
pub struct AisReport {
    /// Message id from the AIS header (1-27).
    pub kind: u8,

    /// Reporting vessel.
    pub mmsi: Mmsi,

    pub body: ReportBody,
}

impl AisReport {
    pub fn new(kind: u8, mmsi: Mmsi, body: ReportBody) -> Self {
        Self { kind, mmsi, body }
    }

    /// The position fix carried by this report, if any.
    pub fn fix(&self) -> Option<&PositionFix> {
        match &self.body {
            ReportBody::PositionA { fix, .. }
            | ReportBody::PositionB { fix }
            | ReportBody::ExtendedB { fix, .. }
            | ReportBody::LongRange { fix } => Some(fix),
            ReportBody::Static { .. } | ReportBody::Other => None,
        }
    }
}

impl fmt::Display for AisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg {} from MMSI:{}", self.kind, self.mmsi)?;
        if let Some(fix) = self.fix() {
            write!(f, " at {}", fix.position())?;
        }
        Ok(())
    }
}
