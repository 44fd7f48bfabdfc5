//! Wire types for the Google Geocoding and Places web services.

use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

impl GeocodeResult {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_text: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub photo_reference: String,
    pub height: u32,
    pub width: u32,
}

/// A single Places API result. Nearby search omits `formatted_address` and
/// returns the shorter `vicinity` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    #[serde(default)]
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
    pub geometry: Geometry,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub photos: Option<Vec<Photo>>,
}

impl PlaceResult {
    /// The full address when present, else the vicinity.
    pub fn address(&self) -> &str {
        if !self.formatted_address.trim().is_empty() {
            return &self.formatted_address;
        }
        self.vicinity.as_deref().unwrap_or("")
    }
}

// ─── Raw response envelopes ──────────────────────────────────────

#[derive(Deserialize, Debug)]
pub(crate) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeEntry>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GeocodeEntry {
    pub geometry: Geometry,
    #[serde(default)]
    pub formatted_address: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DetailsResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<PlaceResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
    #[error("Maps API returned {status}: {message}")]
    Api { status: String, message: String },
    #[error("Nothing found for '{0}'")]
    NotFound(String),
    #[error("Offline mode: '{0}' needs the Maps API")]
    Offline(String),
    #[error("No Google Maps API key configured. Set GOOGLE_MAPS_API_KEY or pass --api-key")]
    MissingApiKey,
}
