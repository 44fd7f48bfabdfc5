//! Great-circle distance between coordinates and its display formatting.
//!
//! Everything in here is pure: no I/O, no validation. Out-of-range or NaN
//! input flows through the arithmetic as NaN; callers that render results
//! should check [`Distance::is_finite`] first.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEG: f64 = PI / 180.0;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const MILES_PER_KM: f64 = 0.621371;
const FEET_PER_MILE: f64 = 5280.0;
const METERS_PER_KM: f64 = 1000.0;

// ─── Coordinate ──────────────────────────────────────────────────

/// A WGS-84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Invalid coordinates ({lat}, {lng}). Lat: -90..90, Lng: -180..180")]
    OutOfRange { lat: f64, lng: f64 },
    #[error("Cannot parse '{0}' as 'lat,lng'")]
    Parse(String),
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Checked constructor for user-supplied input.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        let c = Self::new(lat, lng);
        if c.is_valid() {
            Ok(c)
        } else {
            Err(CoordinateError::OutOfRange { lat, lng })
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance to `other`.
    pub fn distance_to(&self, other: &Coordinate) -> Distance {
        Distance::from_km(distance(*self, *other))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    /// Parses `"lat,lng"` and rejects out-of-range values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| CoordinateError::Parse(s.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| CoordinateError::Parse(s.to_string()))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| CoordinateError::Parse(s.to_string()))?;
        Self::try_new(lat, lng)
    }
}

// ─── Haversine ───────────────────────────────────────────────────

/// Haversine great-circle distance in kilometers.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat * DEG;
    let lat2 = b.lat * DEG;
    let d_lat = (b.lat - a.lat) * DEG;
    let d_lng = (b.lng - a.lng) * DEG;

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn to_miles(km: f64) -> f64 {
    km * MILES_PER_KM
}

pub fn distance_miles(a: Coordinate, b: Coordinate) -> f64 {
    to_miles(distance(a, b))
}

// ─── Units and formatting ────────────────────────────────────────

/// Display unit system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Metric,
    Imperial,
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "metric"),
            Self::Imperial => write!(f, "imperial"),
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "km" => Ok(Self::Metric),
            "imperial" | "mi" => Ok(Self::Imperial),
            _ => Err(format!("Unknown unit '{}'. Use 'metric' or 'imperial'.", s)),
        }
    }
}

/// Render a kilometer value: meters/kilometers or feet/miles.
pub fn format_distance(km: f64, unit: DistanceUnit) -> String {
    match unit {
        DistanceUnit::Metric => {
            if km < 1.0 {
                format!("{} m", (km * METERS_PER_KM).round())
            } else {
                format!("{:.1} km", round_tenth(km))
            }
        }
        DistanceUnit::Imperial => {
            let miles = to_miles(km);
            if miles < 1.0 {
                format!("{} ft", (miles * FEET_PER_MILE).round())
            } else {
                format!("{:.1} mi", round_tenth(miles))
            }
        }
    }
}

/// Round half away from zero to one decimal. `{:.1}` alone rounds ties to even.
fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// A computed distance, stored in kilometers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distance(f64);

impl Distance {
    pub const fn from_km(km: f64) -> Self {
        Self(km)
    }

    pub const fn kilometers(self) -> f64 {
        self.0
    }

    pub fn miles(self) -> f64 {
        to_miles(self.0)
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    pub fn format(self, unit: DistanceUnit) -> String {
        format_distance(self.0, unit)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(DistanceUnit::Metric))
    }
}
