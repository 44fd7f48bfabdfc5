//! Gym records as served by the directory, plus the locator's text filter,
//! rating aggregation and Places-to-gym conversion.

use crate::geo::Coordinate;
use crate::places::PlaceResult;
use crate::ranking::Locatable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Map center used when the caller has no position (San Francisco).
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(37.7749, -122.4194);

/// A gym as listed in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gym {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_reviews: Option<u32>,
}

impl Gym {
    /// Case-insensitive match on name, address or city.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self.address.to_lowercase().contains(&term)
            || self
                .city
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&term))
    }

    pub fn with_reviews(self, summary: ReviewSummary) -> Self {
        Self {
            average_rating: Some(summary.average_rating),
            total_reviews: Some(summary.total_reviews),
            ..self
        }
    }
}

impl Locatable for Gym {
    /// Only gyms with both latitude and longitude are rankable.
    fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        }
    }
}

/// Keep gyms matching `term`, in directory order.
pub fn filter(gyms: Vec<Gym>, term: &str) -> Vec<Gym> {
    if term.is_empty() {
        return gyms;
    }
    gyms.into_iter().filter(|g| g.matches(term)).collect()
}

/// Aggregate of a gym's review ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub total_reviews: u32,
}

impl ReviewSummary {
    pub fn from_ratings(ratings: &[f64]) -> Self {
        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };
        Self {
            average_rating,
            total_reviews: ratings.len() as u32,
        }
    }
}

// ─── Directory file ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Cannot read gym directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid gym directory {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load a JSON array of gyms.
pub fn load_directory(path: &Path) -> Result<Vec<Gym>, DirectoryError> {
    let data = fs::read_to_string(path).map_err(|source| DirectoryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let gyms: Vec<Gym> = serde_json::from_str(&data).map_err(|source| DirectoryError::Json {
        path: path.display().to_string(),
        source,
    })?;
    log::debug!("loaded {} gyms from {}", gyms.len(), path.display());
    Ok(gyms)
}

// ─── Places conversion ───────────────────────────────────────────

/// Place type keywords and the facility label each maps to, in priority order.
const FACILITY_KEYWORDS: &[(&str, &str)] = &[
    ("parking", "Parking"),
    ("shower", "Showers"),
    ("locker", "Locker Room"),
    ("pool", "Pool"),
    ("sauna", "Sauna"),
    ("spa", "Spa"),
    ("cafe", "Cafe"),
    ("wifi", "WiFi"),
];

/// A gym ready to be inserted into the directory (no id, no ratings yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGym {
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub facilities: Option<Vec<String>>,
}

impl NewGym {
    pub fn from_place(place: &PlaceResult) -> Self {
        let address = place.address();
        let parts: Vec<&str> = address.split(',').collect();
        let city = (parts.len() > 1).then(|| parts[parts.len() - 2].trim().to_string());
        let state = (parts.len() > 2).then(|| parts[parts.len() - 1].trim().to_string());

        let description = place.rating.map(|rating| {
            format!(
                "Rating: {}/5 ({} reviews)",
                rating,
                place.user_ratings_total.unwrap_or(0)
            )
        });

        let facilities = place
            .types
            .as_deref()
            .map(facilities_from_types)
            .filter(|f| !f.is_empty());

        Self {
            name: place.name.clone(),
            address: address.to_string(),
            city,
            state,
            latitude: place.geometry.location.lat,
            longitude: place.geometry.location.lng,
            phone: place.formatted_phone_number.clone().filter(|s| !s.is_empty()),
            website: place.website.clone().filter(|s| !s.is_empty()),
            description,
            facilities,
        }
    }
}

impl Locatable for NewGym {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude, self.longitude))
    }
}

fn facilities_from_types(types: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in types {
        let lower = t.to_lowercase();
        let Some(&(_, label)) = FACILITY_KEYWORDS.iter().find(|(kw, _)| lower.contains(kw)) else {
            continue;
        };
        if !out.iter().any(|f| f == label) {
            out.push(label.to_string());
        }
    }
    out
}
