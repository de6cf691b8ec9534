//! Decoder for feed lines carrying decoded AIS reports.
//!
//! The low-level NMEA/six-bit decoding happens upstream. Each feed line is a
//! JSON object produced by that decoder, for example:
//!
//! ```text
//! {"msgId":1,"mmsi":257123450,"lat":60.0,"lon":5.0,"sog":10.0,"heading":90,"second":30,"navStatus":0}
//! {"msgId":5,"mmsi":257123450,"name":"TESTSHIP","callsign":"ABCD","shipType":30}
//! ```
//!
//! Decoding happens in two steps: the line is read into a flat record with
//! every field optional, then the record is checked against the fields its
//! message id requires.

use serde::Deserialize;
use thiserror::Error;

use crate::report::{AisReport, Mmsi, PositionFix, ReportBody, StaticData};

/// Errors that can occur while decoding a feed line.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid report format: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Missing required field '{field}' for message {kind}")]
    MissingField { kind: u8, field: &'static str },

    #[error("Ship type out of range: {0}")]
    InvalidShipType(u16),
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Turns one raw feed line into a report.
pub trait ReportDecoder: Send + Sync {
    fn decode(&self, line: &str) -> DecodeResult<AisReport>;
}

/// Decoder for the JSON-lines report format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportDecoder;

impl ReportDecoder for JsonReportDecoder {
    fn decode(&self, line: &str) -> DecodeResult<AisReport> {
        decode_report(line)
    }
}

/// Flat view of a decoded report with every field optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    msg_id: u8,
    mmsi: Mmsi,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
    #[serde(alias = "speedOverGround")]
    sog: Option<f64>,
    #[serde(alias = "trueHeading")]
    heading: Option<u16>,
    #[serde(alias = "utcSecond")]
    second: Option<u8>,
    #[serde(alias = "navigationalStatus")]
    nav_status: Option<u8>,
    name: Option<String>,
    #[serde(alias = "callSign")]
    callsign: Option<String>,
    ship_type: Option<u16>,
}

impl RawReport {
    fn fix(&self) -> DecodeResult<PositionFix> {
        let latitude = self.lat.ok_or(DecodeError::MissingField {
            kind: self.msg_id,
            field: "lat",
        })?;
        let longitude = self.lon.ok_or(DecodeError::MissingField {
            kind: self.msg_id,
            field: "lon",
        })?;

        Ok(PositionFix {
            latitude,
            longitude,
            speed_over_ground: self.sog,
            true_heading: self.heading,
            utc_second: self.second,
        })
    }

    fn static_data(&self) -> DecodeResult<StaticData> {
        let ship_type = match self.ship_type {
            None => 0,
            Some(t) => u8::try_from(t).map_err(|_| DecodeError::InvalidShipType(t))?,
        };

        Ok(StaticData {
            name: self.name.clone(),
            callsign: self.callsign.clone(),
            ship_type,
        })
    }
}

impl TryFrom<RawReport> for AisReport {
    type Error = DecodeError;

    fn try_from(raw: RawReport) -> Result<Self, Self::Error> {
        let body = match raw.msg_id {
            1..=3 => ReportBody::PositionA {
                fix: raw.fix()?,
                nav_status: raw.nav_status,
            },
            5 | 24 => ReportBody::Static {
                data: raw.static_data()?,
            },
            18 => ReportBody::PositionB { fix: raw.fix()? },
            19 => ReportBody::ExtendedB {
                fix: raw.fix()?,
                data: raw.static_data()?,
            },
            27 => ReportBody::LongRange { fix: raw.fix()? },
            _ => ReportBody::Other,
        };

        Ok(AisReport::new(raw.msg_id, raw.mmsi, body))
    }
}

/// Decode one feed line into an [`AisReport`].
pub fn decode_report(line: &str) -> DecodeResult<AisReport> {
    let raw: RawReport = serde_json::from_str(line.trim())?;
    AisReport::try_from(raw)
}

/// Quick check whether a line could be a report.
///
/// Used to skip banners and keepalives without a full decode.
pub fn looks_like_report(line: &str) -> bool {
    let line = line.trim();
    line.len() > 2 && line.starts_with('{') && line.ends_with('}')
}
