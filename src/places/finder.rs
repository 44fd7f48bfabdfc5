//! Area search: the geocode, nearby and text search fallback chain.
//!
//! Geocode (cache → API) → nearby search → text search biased to the area.
//! If the area cannot be geocoded at all, an unbiased text search is used.

use super::cache::GeocodeCache;
use super::client::MapsGateway;
use super::types::{GeocodeResult, PlaceResult, PlacesError};

pub const DEFAULT_RADIUS_M: u32 = 5000;

/// Options for an area search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub radius_m: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
        }
    }
}

/// What an area search found, and where it centred.
#[derive(Debug, Clone)]
pub struct AreaSearch {
    pub center: Option<GeocodeResult>,
    pub places: Vec<PlaceResult>,
}

pub struct GymFinder<G> {
    gateway: Option<G>,
    cache: GeocodeCache,
    offline: bool,
}

impl<G: MapsGateway> GymFinder<G> {
    /// `gateway` is `None` when no API key is configured; only cached
    /// geocodes can be answered then.
    pub fn new(gateway: Option<G>, cache: GeocodeCache) -> Self {
        Self {
            gateway,
            cache,
            offline: false,
        }
    }

    /// Offline mode skips network calls.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn gateway(&self, what: &str) -> Result<&G, PlacesError> {
        if self.offline {
            return Err(PlacesError::Offline(what.to_string()));
        }
        self.gateway.as_ref().ok_or(PlacesError::MissingApiKey)
    }

    /// Geocode an address, answering from cache when possible.
    pub fn geocode(&mut self, address: &str) -> Result<GeocodeResult, PlacesError> {
        if let Some(hit) = self.cache.get(address) {
            log::debug!("geocode cache hit for '{}'", address);
            return Ok(hit);
        }
        let result = self.gateway(address)?.geocode_address(address)?;
        self.cache.put(address, &result);
        Ok(result)
    }

    /// Find gyms in a named area (e.g. "Toronto downtown").
    pub fn search_area(
        &mut self,
        area: &str,
        opts: &SearchOptions,
    ) -> Result<AreaSearch, PlacesError> {
        log::info!("searching gyms in '{}' (radius {} m)", area, opts.radius_m);
        let text_query = format!("gym in {}", area);

        let center = match self.geocode(area) {
            Ok(c) => c,
            Err(e @ (PlacesError::Offline(_) | PlacesError::MissingApiKey)) => return Err(e),
            Err(e) => {
                log::warn!("geocoding '{}' failed ({}); falling back to text search", area, e);
                let places = self.gateway(area)?.search_gyms(&text_query, None, None)?;
                return Ok(AreaSearch {
                    center: None,
                    places,
                });
            }
        };

        let gateway = self.gateway(area)?;
        let location = center.coordinate();

        let nearby = gateway
            .search_gyms_nearby(location, opts.radius_m)
            .unwrap_or_else(|e| {
                log::warn!("nearby search failed: {}", e);
                Vec::new()
            });

        let places = if nearby.is_empty() {
            log::info!("no nearby results; trying text search '{}'", text_query);
            gateway.search_gyms(&text_query, Some(location), Some(opts.radius_m))?
        } else {
            nearby
        };

        Ok(AreaSearch {
            center: Some(center),
            places,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::places::types::Geometry;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Canned gateway that records every call.
    #[derive(Default)]
    struct FakeMaps {
        geocode: Option<GeocodeResult>,
        nearby: Vec<PlaceResult>,
        text: Vec<PlaceResult>,
        calls: RefCell<Vec<String>>,
    }

    impl MapsGateway for FakeMaps {
        fn geocode_address(&self, address: &str) -> Result<GeocodeResult, PlacesError> {
            self.calls.borrow_mut().push(format!("geocode:{}", address));
            self.geocode
                .clone()
                .ok_or_else(|| PlacesError::NotFound(address.to_string()))
        }

        fn search_gyms(
            &self,
            query: &str,
            location: Option<Coordinate>,
            radius_m: Option<u32>,
        ) -> Result<Vec<PlaceResult>, PlacesError> {
            self.calls.borrow_mut().push(format!(
                "text:{}:{}:{:?}",
                query,
                location.is_some(),
                radius_m
            ));
            Ok(self.text.clone())
        }

        fn search_gyms_nearby(
            &self,
            _location: Coordinate,
            radius_m: u32,
        ) -> Result<Vec<PlaceResult>, PlacesError> {
            self.calls.borrow_mut().push(format!("nearby:{}", radius_m));
            Ok(self.nearby.clone())
        }
    }

    fn place(name: &str) -> PlaceResult {
        PlaceResult {
            place_id: name.to_lowercase(),
            name: name.into(),
            formatted_address: "1 King St, Toronto, Canada".into(),
            vicinity: None,
            geometry: Geometry {
                location: Coordinate::new(43.65, -79.38),
            },
            rating: None,
            user_ratings_total: None,
            formatted_phone_number: None,
            website: None,
            types: None,
            opening_hours: None,
            photos: None,
        }
    }

    fn toronto() -> GeocodeResult {
        GeocodeResult {
            lat: 43.6532,
            lng: -79.3832,
            formatted_address: Some("Toronto, ON, Canada".into()),
        }
    }

    fn finder(fake: FakeMaps) -> (GymFinder<FakeMaps>, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = GeocodeCache::load_from(dir.path().join("geocode.json"));
        (GymFinder::new(Some(fake), cache), dir)
    }

    fn calls(f: &GymFinder<FakeMaps>) -> Vec<String> {
        f.gateway.as_ref().unwrap().calls.borrow().clone()
    }

    #[test]
    fn test_nearby_results() {
        let (mut f, _dir) = finder(FakeMaps {
            geocode: Some(toronto()),
            nearby: vec![place("Iron Temple")],
            ..Default::default()
        });
        let found = f.search_area("Toronto", &SearchOptions::default()).unwrap();
        assert_eq!(found.places.len(), 1);
        assert!(found.center.is_some());
        assert_eq!(calls(&f), vec!["geocode:Toronto", "nearby:5000"]);
    }

    #[test]
    fn test_empty_nearby_falls_back_to_text() {
        let (mut f, _dir) = finder(FakeMaps {
            geocode: Some(toronto()),
            text: vec![place("Yoga Loft")],
            ..Default::default()
        });
        let opts = SearchOptions { radius_m: 2000 };
        let found = f.search_area("Toronto", &opts).unwrap();
        assert_eq!(found.places[0].name, "Yoga Loft");
        assert_eq!(
            calls(&f),
            vec!["geocode:Toronto", "nearby:2000", "text:gym in Toronto:true:Some(2000)"]
        );
    }

    #[test]
    fn test_geocode_failure_falls_back_to_unbiased_text() {
        let (mut f, _dir) = finder(FakeMaps {
            text: vec![place("Iron Temple")],
            ..Default::default()
        });
        let found = f.search_area("Atlantis", &SearchOptions::default()).unwrap();
        assert!(found.center.is_none());
        assert_eq!(found.places.len(), 1);
        assert_eq!(
            calls(&f),
            vec!["geocode:Atlantis", "text:gym in Atlantis:false:None"]
        );
    }

    #[test]
    fn test_geocode_is_cached() {
        let (mut f, _dir) = finder(FakeMaps {
            geocode: Some(toronto()),
            ..Default::default()
        });
        f.geocode("Toronto").unwrap();
        f.geocode("toronto").unwrap();
        assert_eq!(calls(&f), vec!["geocode:Toronto"]);

        f.set_offline(true);
        assert!(f.geocode("TORONTO").is_ok());
        assert!(matches!(f.geocode("Ottawa"), Err(PlacesError::Offline(_))));
    }

    #[test]
    fn test_offline_search() {
        let (mut f, _dir) = finder(FakeMaps::default());
        f.set_offline(true);
        assert!(matches!(
            f.search_area("Toronto", &SearchOptions::default()),
            Err(PlacesError::Offline(_))
        ));
        assert!(calls(&f).is_empty());
    }

    #[test]
    fn test_no_gateway() {
        let dir = TempDir::new().unwrap();
        let cache = GeocodeCache::load_from(dir.path().join("geocode.json"));
        let mut f: GymFinder<FakeMaps> = GymFinder::new(None, cache);
        assert!(matches!(f.geocode("Toronto"), Err(PlacesError::MissingApiKey)));
    }
}
