//! Ship type and navigational status lookup.
//!
//! Maps the numeric AIS ship-and-cargo type code to a short description and
//! an optional semantic tag used for filtering and display.

use serde::Serialize;
use std::fmt;

/// Tag carried by every vessel created from an AIS feed.
pub const BASE_TAG: &str = "AIS";

/// Semantic tag derived from a ship type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tag {
    SearchAndRescue,
    LawEnforcement,
    Medical,
    Passenger,
    Special,
    Cargo,
    Tanker,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::SearchAndRescue => "AIS.SAR",
            Tag::LawEnforcement => "AIS.law",
            Tag::Medical => "AIS.medical",
            Tag::Passenger => "AIS.passenger",
            Tag::Special => "AIS.special",
            Tag::Cargo => "AIS.cargo",
            Tag::Tanker => "AIS.tanker",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a ship type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub description: &'static str,
    pub tag: Option<Tag>,
}

impl Classification {
    const fn plain(description: &'static str) -> Self {
        Self {
            description,
            tag: None,
        }
    }

    const fn tagged(description: &'static str, tag: Tag) -> Self {
        Self {
            description,
            tag: Some(tag),
        }
    }
}

/// Classify a ship type code.
///
/// Total over all inputs: codes without a mapping (including 0, "not
/// available") classify as "Undefined" without a tag.
pub fn classify(type_code: u8) -> Classification {
    match type_code {
        20..=29 => Classification::plain("WIG (US)"),

        // 3x: engaged in
        30 => Classification::plain("Fishing"),
        31 | 32 => Classification::plain("Towing"),
        33 | 34 => Classification::plain("Underwater ops"),
        35 => Classification::plain("Military ops"),
        36 => Classification::plain("Sailing"),
        37 => Classification::plain("Recreational"),

        // 5x: special craft
        50 => Classification::tagged("Pilot", Tag::Special),
        51 => Classification::tagged("Search & rescue", Tag::SearchAndRescue),
        54 => Classification::tagged("Commercial response", Tag::Special),
        55 => Classification::tagged("Law enforcement", Tag::LawEnforcement),
        56 | 57 => Classification::tagged("Assignment..", Tag::Special),
        58 => Classification::tagged("Medical/public safety", Tag::Medical),
        52 | 53 | 59 => Classification::tagged("Special..", Tag::Special),

        // 4x: high speed craft, 6x: passenger
        41 | 61 => Classification::tagged("Passenger < 12 pas", Tag::Passenger),
        43 | 63 => Classification::tagged("Ferry < 150 pas", Tag::Passenger),
        44 | 64 => Classification::tagged("Ferry >= 150 pas", Tag::Passenger),
        40..=49 => Classification::tagged("HS passenger", Tag::Passenger),
        60..=69 => Classification::tagged("Passenger", Tag::Passenger),

        70..=79 => Classification::tagged("Cargo", Tag::Cargo),
        80..=89 => Classification::tagged("Tanker", Tag::Tanker),
        90..=99 => Classification::plain("Other"),
        _ => Classification::plain("Undefined"),
    }
}

/// Text for a navigational status code (-1 = unknown).
pub fn nav_status_text(status: i16) -> &'static str {
    match status {
        0 => "Under way using engine",
        1 => "At anchor",
        2 => "Not under command",
        3 => "Restricted manoeuvrability",
        4 => "Constrained by her draught",
        5 => "Moored",
        6 => "Aground",
        7 => "Engaged in fishing",
        8 => "Under way sailing",
        14 => "AIS-SART (active)",
        _ => "Undefined",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representative_codes() {
        assert_eq!(classify(30), Classification::plain("Fishing"));
        assert_eq!(classify(36).description, "Sailing");

        let rec = classify(37);
        assert_eq!(rec.description, "Recreational");
        assert_eq!(rec.tag, None);

        let sar = classify(51);
        assert_eq!(sar.description, "Search & rescue");
        assert_eq!(sar.tag, Some(Tag::SearchAndRescue));
        assert_eq!(sar.tag.unwrap().as_str(), "AIS.SAR");

        assert_eq!(classify(55).tag.unwrap().as_str(), "AIS.law");
        assert_eq!(classify(58).tag.unwrap().as_str(), "AIS.medical");
    }

    #[test]
    fn test_families() {
        for code in (40..50).chain(60..70) {
            assert_eq!(classify(code).tag, Some(Tag::Passenger), "code {}", code);
        }
        for code in [50, 52, 53, 54, 56, 57, 59] {
            assert_eq!(classify(code).tag, Some(Tag::Special), "code {}", code);
        }
        for code in 70..80 {
            assert_eq!(classify(code), Classification::tagged("Cargo", Tag::Cargo));
        }
        for code in 80..90 {
            assert_eq!(classify(code), Classification::tagged("Tanker", Tag::Tanker));
        }
        assert_eq!(classify(44).description, "Ferry >= 150 pas");
        assert_eq!(classify(47).description, "HS passenger");
        assert_eq!(classify(69).description, "Passenger");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(classify(0), Classification::plain("Undefined"));
        assert_eq!(classify(19).description, "Undefined");
        assert_eq!(classify(38).description, "Undefined");
        assert_eq!(classify(95).description, "Other");
        assert_eq!(classify(255).description, "Undefined");
        assert_eq!(classify(25).description, "WIG (US)");
    }

    #[test]
    fn test_total_over_range() {
        for code in 0..=u8::MAX {
            assert!(!classify(code).description.is_empty());
        }
    }

    #[test]
    fn test_nav_status_text() {
        assert_eq!(nav_status_text(-1), "Undefined");
        assert_eq!(nav_status_text(0), "Under way using engine");
        assert_eq!(nav_status_text(7), "Engaged in fishing");
        assert_eq!(nav_status_text(14), "AIS-SART (active)");
        assert_eq!(nav_status_text(15), "Undefined");
    }
}
