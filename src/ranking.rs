//! Proximity ranking of entities around a reference coordinate.
//!
//! Entities with a coordinate come first, nearest first. Entities without one
//! are pushed to the end. The sort is stable, so ties and unrankable entities
//! keep their input order.

use crate::geo::{Coordinate, Distance};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Anything that may carry a position.
pub trait Locatable {
    fn coordinate(&self) -> Option<Coordinate>;
}

impl<T: Locatable + ?Sized> Locatable for &T {
    fn coordinate(&self) -> Option<Coordinate> {
        (**self).coordinate()
    }
}

/// An opaque identifier with an optional position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatableEntity<Id> {
    pub id: Id,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
}

impl<Id> LocatableEntity<Id> {
    pub fn new(id: Id, coordinate: Option<Coordinate>) -> Self {
        Self { id, coordinate }
    }
}

impl<Id> Locatable for LocatableEntity<Id> {
    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }
}

/// An entity together with its distance from the ranking origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<T> {
    pub entity: T,
    pub distance: Option<Distance>,
}

/// Rank entities by distance from `origin`, keeping the computed distances.
pub fn rank_with_distance<T: Locatable>(origin: Coordinate, entities: Vec<T>) -> Vec<Ranked<T>> {
    let mut ranked: Vec<Ranked<T>> = entities
        .into_iter()
        .map(|entity| {
            // A non-finite distance cannot be ordered; treat it as unrankable.
            let distance = entity
                .coordinate()
                .map(|c| origin.distance_to(&c))
                .filter(|d| d.is_finite());
            Ranked { entity, distance }
        })
        .collect();

    // `sort_by` is stable.
    ranked.sort_by(|a, b| compare(a.distance, b.distance));
    ranked
}

/// Rank entities by distance from `origin`.
pub fn rank<T: Locatable>(origin: Coordinate, entities: Vec<T>) -> Vec<T> {
    rank_with_distance(origin, entities)
        .into_iter()
        .map(|r| r.entity)
        .collect()
}

/// Rank when an origin is known, otherwise return the input untouched.
pub fn rank_optional<T: Locatable>(origin: Option<Coordinate>, entities: Vec<T>) -> Vec<Ranked<T>> {
    match origin {
        Some(origin) => rank_with_distance(origin, entities),
        None => entities
            .into_iter()
            .map(|entity| Ranked { entity, distance: None })
            .collect(),
    }
}

fn compare(a: Option<Distance>, b: Option<Distance>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
