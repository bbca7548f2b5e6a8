//! Regulatory zone classification
//!
//! A zone is derived purely from the ownship position. The rules are
//! evaluated in order and the first match wins; Israel is tested before
//! Europe because it lies inside the Europe longitude band.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Geographic region that determines which frequencies and timings are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Zone {
    /// No schedule can be resolved, radios stay idle
    #[default]
    Unclassified = 0,
    /// Europe, Africa, Russia, China (30W to 110E, excluding Israel)
    Europe = 1,
    /// North America (west of 30W, north of 10N)
    NorthAmerica = 2,
    /// New Zealand (east of 160E)
    NewZealand = 3,
    /// Australia (110E to 160E)
    Australia = 4,
    /// Israel (34E to 54E and 29.25N to 33.5N)
    Israel = 5,
    /// South America (west of 30W, south of 10N)
    SouthAmerica = 6,
}

impl Zone {
    /// Every zone, `Unclassified` first
    pub const ALL: [Zone; 7] = [
        Zone::Unclassified,
        Zone::Europe,
        Zone::NorthAmerica,
        Zone::NewZealand,
        Zone::Australia,
        Zone::Israel,
        Zone::SouthAmerica,
    ];

    /// Name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Unclassified => "Unclassified",
            Zone::Europe => "Europe",
            Zone::NorthAmerica => "NorthAmerica",
            Zone::NewZealand => "NewZealand",
            Zone::Australia => "Australia",
            Zone::Israel => "Israel",
            Zone::SouthAmerica => "SouthAmerica",
        }
    }

    /// Recover a zone from its `repr(u8)` value; unknown values map to `Unclassified`
    pub fn from_u8(value: u8) -> Zone {
        Zone::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(Zone::Unclassified)
    }

    /// Whether a transmission/reception schedule can exist in this zone
    pub fn is_classified(&self) -> bool {
        *self != Zone::Unclassified
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Zone::ALL
            .into_iter()
            .find(|zone| zone.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownZone(s.to_string()))
    }
}

/// Classify a position (degrees) into its regulatory zone
///
/// Non-finite or out-of-range coordinates yield `Zone::Unclassified`.
pub fn zone_of(lat: f32, lon: f32) -> Zone {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Zone::Unclassified;
    }

    if (34.0..=54.0).contains(&lon) && (29.25..=33.5).contains(&lat) {
        Zone::Israel
    } else if (-30.0..=110.0).contains(&lon) {
        Zone::Europe
    } else if lon < -30.0 && lat > 10.0 {
        Zone::NorthAmerica
    } else if lon > 160.0 {
        Zone::NewZealand
    } else if (110.0..=160.0).contains(&lon) {
        Zone::Australia
    } else if lon < -30.0 && lat <= 10.0 {
        Zone::SouthAmerica
    } else {
        Zone::Unclassified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_positions() {
        assert_eq!(zone_of(51.0, 4.0), Zone::Europe);
        assert_eq!(zone_of(51.0, 120.0), Zone::Australia);
        assert_eq!(zone_of(0.0, 0.0), Zone::Europe);
        assert_eq!(zone_of(32.0, 35.0), Zone::Israel);
        assert_eq!(zone_of(45.0, -100.0), Zone::NorthAmerica);
        assert_eq!(zone_of(-41.0, 174.0), Zone::NewZealand);
        assert_eq!(zone_of(-23.0, -46.0), Zone::SouthAmerica);
    }

    #[test]
    fn test_equator_boundary_west_is_south_america() {
        assert_eq!(zone_of(10.0, -60.0), Zone::SouthAmerica);
        assert_eq!(zone_of(10.01, -60.0), Zone::NorthAmerica);
    }

    #[test]
    fn test_invalid_positions_are_unclassified() {
        assert_eq!(zone_of(f32::NAN, 4.0), Zone::Unclassified);
        assert_eq!(zone_of(51.0, f32::INFINITY), Zone::Unclassified);
        assert_eq!(zone_of(91.0, 4.0), Zone::Unclassified);
        assert_eq!(zone_of(51.0, -181.0), Zone::Unclassified);
    }

    #[test]
    fn test_zone_names_and_repr() {
        for zone in Zone::ALL {
            assert_eq!(zone.as_str().parse::<Zone>(), Ok(zone));
            assert_eq!(Zone::from_u8(zone as u8), zone);
        }
        assert_eq!(Zone::from_u8(200), Zone::Unclassified);
        assert!("Atlantis".parse::<Zone>().is_err());
    }
}
