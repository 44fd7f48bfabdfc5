//! Gym discovery through the Google Maps web services.
//!
//! Provides address geocoding, Places searches, a local geocode cache,
//! and the area search fallback chain.

pub mod cache;
pub mod client;
pub mod finder;
pub mod types;

pub use cache::GeocodeCache;
pub use client::{MapsClient, MapsGateway};
pub use finder::{AreaSearch, GymFinder, SearchOptions};
pub use types::{GeocodeResult, PlaceResult, PlacesError};
