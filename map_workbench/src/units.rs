//! Measurement units and the magnitude scaling the engine reports.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Linear measurement units accepted by analysis requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearUnit {
    Meters,
    Kilometers,
    Feet,
    Miles,
}

impl LinearUnit {
    /// Conversion factor from this unit into meters.
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Kilometers => 1000.0,
            Self::Feet => 0.3048,
            Self::Miles => 1609.34,
        }
    }

    /// Converts `value` expressed in this unit to meters.
    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Feet => "ft",
            Self::Miles => "mi",
        }
    }
}

impl FromStr for LinearUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m" | "meters" => Ok(Self::Meters),
            "km" | "kilometers" => Ok(Self::Kilometers),
            "ft" | "feet" => Ok(Self::Feet),
            "mi" | "miles" => Ok(Self::Miles),
            other => Err(format!("unknown linear unit '{other}'")),
        }
    }
}

/// Areal measurement units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaUnit {
    SquareMeters,
    Hectares,
    SquareKilometers,
}

impl AreaUnit {
    /// Conversion factor from this unit into square meters.
    pub fn square_meters_per_unit(self) -> f64 {
        match self {
            Self::SquareMeters => 1.0,
            Self::Hectares => 10_000.0,
            Self::SquareKilometers => 1_000_000.0,
        }
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::SquareMeters => "m²",
            Self::Hectares => "ha",
            Self::SquareKilometers => "km²",
        }
    }
}

/// Lengths switch from meters to kilometers at this many meters.
pub const KILOMETER_THRESHOLD: f64 = 1000.0;
/// Areas switch from square meters to hectares at this many square meters.
pub const HECTARE_THRESHOLD: f64 = 1000.0;
/// Areas switch from hectares to square kilometers at this many square meters.
pub const SQUARE_KILOMETER_THRESHOLD: f64 = 1_000_000.0;

/// Formats a length in meters, scaling to kilometers at the threshold.
pub fn format_length(meters: f64) -> String {
    if meters >= KILOMETER_THRESHOLD {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{meters:.2} m")
    }
}

/// Formats an area in square meters, scaling to hectares and square
/// kilometers at the thresholds.
pub fn format_area(square_meters: f64) -> String {
    if square_meters >= SQUARE_KILOMETER_THRESHOLD {
        format!("{:.2} km²", square_meters / 1_000_000.0)
    } else if square_meters >= HECTARE_THRESHOLD {
        format!("{:.2} ha", square_meters / 10_000.0)
    } else {
        format!("{square_meters:.2} m²")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_factors() {
        assert_eq!(LinearUnit::Kilometers.to_meters(1.0), 1000.0);
        assert_eq!(LinearUnit::Feet.to_meters(1.0), 0.3048);
        assert_eq!(LinearUnit::Miles.to_meters(1.0), 1609.34);
        assert_eq!(LinearUnit::Meters.to_meters(42.0), 42.0);
    }

    #[test]
    fn length_scaling() {
        assert_eq!(format_length(850.0), "850.00 m");
        assert_eq!(format_length(1000.0), "1.00 km");
        assert_eq!(format_length(1500.0), "1.50 km");
    }

    #[test]
    fn area_scaling() {
        assert_eq!(format_area(850.0), "850.00 m²");
        assert_eq!(format_area(5000.0), "0.50 ha");
        assert_eq!(format_area(15_000.0), "1.50 ha");
        assert_eq!(format_area(2_000_000.0), "2.00 km²");
    }

    #[test]
    fn unit_parsing() {
        assert_eq!("kilometers".parse::<LinearUnit>(), Ok(LinearUnit::Kilometers));
        assert_eq!("KM".parse::<LinearUnit>(), Ok(LinearUnit::Kilometers));
        assert!("furlongs".parse::<LinearUnit>().is_err());
    }
}
