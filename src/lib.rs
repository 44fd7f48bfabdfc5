//! Gym locator engine.
//!
//! The pure core is [`geo`] (Haversine distance and display formatting) and
//! [`ranking`] (proximity ordering). Around it sit the gym directory
//! types, a Google Maps client for gym discovery, and an HTTP API.

pub mod geo;
pub mod gym;
pub mod places;
pub mod ranking;
pub mod server;

pub use geo::{distance, format_distance, to_miles, Coordinate, Distance, DistanceUnit};
pub use ranking::{rank, rank_with_distance, Locatable, LocatableEntity, Ranked};
