//! Blocking client for the Google Geocoding and Places web services.

use super::types::{
    DetailsResponse, GeocodeResponse, GeocodeResult, PlaceResult, PlacesError, SearchResponse,
};
use crate::geo::Coordinate;
use serde::de::DeserializeOwned;
use std::thread;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Nearby Search rejects radii above 50 km.
pub const MAX_NEARBY_RADIUS_M: u32 = 50_000;

/// Pause between batch geocoding requests (the API allows 50 req/s).
const BATCH_DELAY: Duration = Duration::from_millis(100);

const DETAIL_FIELDS: &[&str] = &[
    "name",
    "formatted_address",
    "geometry",
    "rating",
    "user_ratings_total",
    "formatted_phone_number",
    "website",
    "types",
    "opening_hours",
    "photos",
];

const USER_AGENT: &str = "gym-locator/0.3";

/// The lookups the area search needs from a maps provider.
pub trait MapsGateway {
    fn geocode_address(&self, address: &str) -> Result<GeocodeResult, PlacesError>;

    fn search_gyms(
        &self,
        query: &str,
        location: Option<Coordinate>,
        radius_m: Option<u32>,
    ) -> Result<Vec<PlaceResult>, PlacesError>;

    fn search_gyms_nearby(
        &self,
        location: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<PlaceResult>, PlacesError>;
}

pub struct MapsClient {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl MapsClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, PlacesError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PlacesError::MissingApiKey);
        }
        let agent = ureq::AgentBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build();
        Ok(Self {
            agent,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}?", self.base_url, path);
        for (k, v) in params {
            url.push_str(k);
            url.push('=');
            url.push_str(&urlencoding::encode(v));
            url.push('&');
        }
        url.push_str("key=");
        url.push_str(&urlencoding::encode(&self.api_key));
        url
    }

    fn redact(&self, url: &str) -> String {
        url.replace(&*urlencoding::encode(&self.api_key), "API_KEY_HIDDEN")
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlacesError> {
        let url = self.url(path, params);
        log::debug!("GET {}", self.redact(&url));

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| PlacesError::Network(self.redact(&e.to_string())))?;

        response
            .into_json()
            .map_err(|e| PlacesError::InvalidResponse(e.to_string()))
    }

    /// Geocode each address in turn. Failures are logged and yield `None`.
    pub fn geocode_addresses(&self, addresses: &[String]) -> Vec<Option<GeocodeResult>> {
        let mut results = Vec::with_capacity(addresses.len());
        for (i, address) in addresses.iter().enumerate() {
            if i > 0 {
                thread::sleep(BATCH_DELAY);
            }
            match self.geocode_address(address) {
                Ok(r) => results.push(Some(r)),
                Err(e) => {
                    log::warn!("geocoding '{}' failed: {}", address, e);
                    results.push(None);
                }
            }
        }
        results
    }

    /// Formatted address of the first reverse-geocoding result.
    pub fn reverse_geocode(&self, location: Coordinate) -> Result<String, PlacesError> {
        let latlng = format!("{},{}", location.lat, location.lng);
        let response: GeocodeResponse =
            self.get_json("geocode/json", &[("latlng", latlng.clone())])?;
        let result = geocode_from_response(&latlng, response)?;
        result
            .formatted_address
            .ok_or_else(|| PlacesError::InvalidResponse("no formatted_address".into()))
    }

    pub fn place_details(&self, place_id: &str) -> Result<PlaceResult, PlacesError> {
        let response: DetailsResponse = self.get_json(
            "place/details/json",
            &[
                ("place_id", place_id.to_string()),
                ("fields", DETAIL_FIELDS.join(",")),
            ],
        )?;
        details_from_response(place_id, response)
    }
}

impl MapsGateway for MapsClient {
    fn geocode_address(&self, address: &str) -> Result<GeocodeResult, PlacesError> {
        let response: GeocodeResponse =
            self.get_json("geocode/json", &[("address", address.to_string())])?;
        geocode_from_response(address, response)
    }

    fn search_gyms(
        &self,
        query: &str,
        location: Option<Coordinate>,
        radius_m: Option<u32>,
    ) -> Result<Vec<PlaceResult>, PlacesError> {
        let mut params = vec![("query", query.to_string()), ("type", "gym".to_string())];
        if let Some(c) = location {
            params.push(("location", format!("{},{}", c.lat, c.lng)));
        }
        if let Some(r) = radius_m {
            params.push(("radius", r.to_string()));
        }
        let response: SearchResponse = self.get_json("place/textsearch/json", &params)?;
        let places = places_from_response(response)?;
        log::info!("text search '{}': {} results", query, places.len());
        Ok(places)
    }

    fn search_gyms_nearby(
        &self,
        location: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<PlaceResult>, PlacesError> {
        let params = [
            ("location", format!("{},{}", location.lat, location.lng)),
            ("radius", radius_m.min(MAX_NEARBY_RADIUS_M).to_string()),
            ("type", "gym".to_string()),
        ];
        let response: SearchResponse = self.get_json("place/nearbysearch/json", &params)?;
        let places = places_from_response(response)?;
        log::info!("nearby search at {}: {} results", location, places.len());
        Ok(places)
    }
}

// ─── Response interpretation ─────────────────────────────────────

fn api_error(status: String, message: Option<String>) -> PlacesError {
    PlacesError::Api {
        status,
        message: message.unwrap_or_else(|| "no error message".into()),
    }
}

fn geocode_from_response(
    query: &str,
    response: GeocodeResponse,
) -> Result<GeocodeResult, PlacesError> {
    match response.status.as_str() {
        "OK" => response
            .results
            .into_iter()
            .next()
            .map(|r| GeocodeResult {
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
                formatted_address: r.formatted_address,
            })
            .ok_or_else(|| PlacesError::NotFound(query.to_string())),
        "ZERO_RESULTS" => Err(PlacesError::NotFound(query.to_string())),
        _ => Err(api_error(response.status.clone(), response.error_message)),
    }
}

fn places_from_response(response: SearchResponse) -> Result<Vec<PlaceResult>, PlacesError> {
    match response.status.as_str() {
        "OK" => Ok(response.results),
        "ZERO_RESULTS" => Ok(Vec::new()),
        _ => Err(api_error(response.status.clone(), response.error_message)),
    }
}

fn details_from_response(
    place_id: &str,
    response: DetailsResponse,
) -> Result<PlaceResult, PlacesError> {
    let DetailsResponse {
        status,
        result,
        error_message,
    } = response;
    match (status.as_str(), result) {
        ("OK", Some(place)) => Ok(place),
        ("OK", None) | ("NOT_FOUND", _) | ("ZERO_RESULTS", _) => {
            Err(PlacesError::NotFound(place_id.to_string()))
        }
        _ => Err(api_error(status.clone(), error_message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MapsClient {
        MapsClient::new("secret-key").unwrap()
    }

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(MapsClient::new("  "), Err(PlacesError::MissingApiKey)));
    }

    #[test]
    fn test_query_encoding() {
        let c = client().with_base_url("http://localhost:9000");
        let url = c.url(
            "place/textsearch/json",
            &[
                ("query", "gym in Tromsø".into()),
                ("location", "a&b=c,d".into()),
                ("type", "safe-_.~".into()),
            ],
        );
        assert_eq!(
            url,
            "http://localhost:9000/place/textsearch/json?query=gym%20in%20Troms%C3%B8&location=a%26b%3Dc%2Cd&type=safe-_.~&key=secret-key"
        );
    }

    #[test]
    fn test_redact_encoded_key() {
        let c = MapsClient::new("k+y/1").unwrap();
        let url = c.url("geocode/json", &[("address", "x".into())]);
        assert!(url.ends_with("key=k%2By%2F1"));
        assert_eq!(c.redact(&url), url.replace("k%2By%2F1", "API_KEY_HIDDEN"));
        assert!(!c.redact(&url).contains("k%2By%2F1"));
    }

    #[test]
    fn test_url_building() {
        let c = client().with_base_url("http://localhost:9000/maps/api/");
        let url = c.url("geocode/json", &[("address", "1 Main St, Oakland".into())]);
        assert_eq!(
            url,
            "http://localhost:9000/maps/api/geocode/json?address=1%20Main%20St%2C%20Oakland&key=secret-key"
        );
        assert!(!c.redact(&url).contains("secret-key"));
        assert!(c.redact(&url).ends_with("key=API_KEY_HIDDEN"));
    }

    #[test]
    fn test_geocode_ok() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [
                    {"formatted_address": "Toronto, ON, Canada",
                     "geometry": {"location": {"lat": 43.6532, "lng": -79.3832}}},
                    {"formatted_address": "Toronto, OH, USA",
                     "geometry": {"location": {"lat": 40.46, "lng": -80.6}}}
                ]
            }"#,
        )
        .unwrap();
        let r = geocode_from_response("Toronto", response).unwrap();
        assert_eq!(r.lat, 43.6532);
        assert_eq!(r.formatted_address.as_deref(), Some("Toronto, ON, Canada"));
    }

    #[test]
    fn test_geocode_zero_results() {
        let response: GeocodeResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(matches!(
            geocode_from_response("nowhere", response),
            Err(PlacesError::NotFound(q)) if q == "nowhere"
        ));
    }

    #[test]
    fn test_geocode_denied() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap();
        match geocode_from_response("x", response) {
            Err(PlacesError::Api { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_search_result_with_address_and_vicinity() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "name": "Iron Temple",
                    "formatted_address": "12 Queen St W, Toronto, ON M5H 2N2, Canada",
                    "vicinity": "12 Queen St, Toronto",
                    "geometry": {"location": {"lat": 43.65, "lng": -79.38}}
                }]
            }"#,
        )
        .unwrap();
        let places = places_from_response(response).unwrap();
        assert_eq!(places[0].address(), "12 Queen St W, Toronto, ON M5H 2N2, Canada");
        assert_eq!(places[0].vicinity.as_deref(), Some("12 Queen St, Toronto"));
    }

    #[test]
    fn test_search_response() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "place_id": "p1",
                    "name": "Iron Temple",
                    "vicinity": "12 Queen St, Toronto",
                    "geometry": {"location": {"lat": 43.65, "lng": -79.38}},
                    "rating": 4.6,
                    "user_ratings_total": 88,
                    "types": ["gym", "health"],
                    "opening_hours": {"open_now": true}
                }]
            }"#,
        )
        .unwrap();
        let places = places_from_response(response).unwrap();
        assert_eq!(places.len(), 1);
        assert!(places[0].formatted_address.is_empty());
        assert_eq!(places[0].address(), "12 Queen St, Toronto");
        assert_eq!(places[0].opening_hours.as_ref().and_then(|h| h.open_now), Some(true));

        let empty: SearchResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(places_from_response(empty).unwrap().is_empty());

        let limited: SearchResponse =
            serde_json::from_str(r#"{"status": "OVER_QUERY_LIMIT"}"#).unwrap();
        assert!(matches!(places_from_response(limited), Err(PlacesError::Api { .. })));
    }

    #[test]
    fn test_details_response() {
        let response: DetailsResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "result": {
                    "name": "Iron Temple",
                    "formatted_address": "12 Queen St, Toronto, Canada",
                    "geometry": {"location": {"lat": 43.65, "lng": -79.38}},
                    "website": "https://iron.example",
                    "photos": [{"photo_reference": "ref", "height": 400, "width": 600}]
                }
            }"#,
        )
        .unwrap();
        let place = details_from_response("p1", response).unwrap();
        assert_eq!(place.website.as_deref(), Some("https://iron.example"));
        assert_eq!(place.photos.map(|p| p.len()), Some(1));

        let missing: DetailsResponse = serde_json::from_str(r#"{"status": "NOT_FOUND"}"#).unwrap();
        assert!(matches!(details_from_response("p1", missing), Err(PlacesError::NotFound(_))));
    }
}
