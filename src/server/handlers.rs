use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::geo::{format_distance, Coordinate, DistanceUnit};
use crate::gym::{self, Gym, NewGym};
use crate::places::{GeocodeResult, PlacesError, SearchOptions};
use crate::ranking::{rank_optional, LocatableEntity};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

impl From<PlacesError> for ApiError {
    fn from(e: PlacesError) -> Self {
        let status = match e {
            PlacesError::NotFound(_) => StatusCode::NOT_FOUND,
            PlacesError::Offline(_) | PlacesError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            PlacesError::Network(_) | PlacesError::InvalidResponse(_) | PlacesError::Api { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };
        api_error(status, e.to_string())
    }
}

fn parse_coordinate(s: &str) -> Result<Coordinate, ApiError> {
    s.parse()
        .map_err(|e: crate::geo::CoordinateError| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}

fn parse_unit(s: Option<&str>) -> Result<DistanceUnit, ApiError> {
    match s {
        None => Ok(DistanceUnit::Metric),
        Some(u) => u.parse().map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e)),
    }
}

/// Both or neither of `lat`/`lng`.
fn optional_origin(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Coordinate>, ApiError> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Coordinate::try_new(lat, lng)
            .map(Some)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string())),
        (None, None) => Ok(None),
        _ => Err(api_error(StatusCode::BAD_REQUEST, "Provide both 'lat' and 'lng' or neither")),
    }
}

// ─── GET /api/distance ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct DistanceQuery {
    pub from: String,
    pub to: String,
    pub unit: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct DistanceResponse {
    pub kilometers: f64,
    pub miles: f64,
    pub formatted: String,
}

pub async fn distance(
    Query(params): Query<DistanceQuery>,
) -> Result<Json<DistanceResponse>, ApiError> {
    let from = parse_coordinate(&params.from)?;
    let to = parse_coordinate(&params.to)?;
    let unit = parse_unit(params.unit.as_deref())?;

    let d = from.distance_to(&to);
    Ok(Json(DistanceResponse {
        kilometers: d.kilometers(),
        miles: d.miles(),
        formatted: d.format(unit),
    }))
}

// ─── GET /api/format ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FormatQuery {
    pub km: f64,
    pub unit: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct FormatResponse {
    pub formatted: String,
}

pub async fn format(Query(params): Query<FormatQuery>) -> Result<Json<FormatResponse>, ApiError> {
    if !params.km.is_finite() || params.km < 0.0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "'km' must be a finite, non-negative number",
        ));
    }
    let unit = parse_unit(params.unit.as_deref())?;
    Ok(Json(FormatResponse {
        formatted: format_distance(params.km, unit),
    }))
}

// ─── POST /api/rank ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RankEntity {
    pub id: String,
    pub lat: Option<f64>,
    #[serde(alias = "lon")]
    pub lng: Option<f64>,
}

#[derive(Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub origin: Option<Coordinate>,
    #[serde(default)]
    pub unit: DistanceUnit,
    pub entities: Vec<RankEntity>,
}

#[derive(Serialize, Debug)]
pub struct RankedEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

pub async fn rank(Json(req): Json<RankRequest>) -> Result<Json<Vec<RankedEntry>>, ApiError> {
    if req.origin.is_some_and(|o| !o.is_valid()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid origin. Lat: -90..90, Lng: -180..180",
        ));
    }

    let entities: Vec<LocatableEntity<String>> = req
        .entities
        .into_iter()
        .map(|e| {
            let coordinate = match (e.lat, e.lng) {
                (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
                _ => None,
            };
            LocatableEntity::new(e.id, coordinate)
        })
        .collect();

    let ranked = rank_optional(req.origin, entities)
        .into_iter()
        .map(|r| {
            let shown = r.distance.filter(|d| d.is_finite());
            RankedEntry {
                id: r.entity.id,
                distance_km: shown.map(|d| d.kilometers()),
                formatted: shown.map(|d| d.format(req.unit)),
            }
        })
        .collect();

    Ok(Json(ranked))
}

// ─── GET /api/gyms ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GymsQuery {
    pub lat: Option<f64>,
    #[serde(alias = "lon")]
    pub lng: Option<f64>,
    pub q: Option<String>,
    pub unit: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct GymEntry {
    #[serde(flatten)]
    pub gym: Gym,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
}

pub async fn gyms(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GymsQuery>,
) -> Result<Json<Vec<GymEntry>>, ApiError> {
    let start = Instant::now();
    let origin = optional_origin(params.lat, params.lng)?;
    let unit = parse_unit(params.unit.as_deref())?;
    let term = params.q.as_deref().unwrap_or("").trim();

    let matching = gym::filter(state.gyms.clone(), term);
    let entries: Vec<GymEntry> = rank_optional(origin, matching)
        .into_iter()
        .map(|r| {
            let shown = r.distance.filter(|d| d.is_finite());
            GymEntry {
                gym: r.entity,
                distance_km: shown.map(|d| d.kilometers()),
                distance: shown.map(|d| d.format(unit)),
            }
        })
        .collect();

    log::info!(
        "GET /api/gyms q='{}' origin={} -> {} gyms ({:.1}ms)",
        term,
        origin.map(|o| o.to_string()).unwrap_or_else(|| "-".into()),
        entries.len(),
        start.elapsed().as_secs_f64() * 1000.0,
    );

    Ok(Json(entries))
}

// ─── GET /api/search ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SearchQuery {
    pub area: Option<String>,
    pub radius: Option<u32>,
}

#[derive(Serialize, Debug)]
pub struct SearchResponse {
    pub center: Option<GeocodeResult>,
    pub gyms: Vec<NewGym>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let area = params.area.as_deref().unwrap_or("").trim().to_string();
    if area.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'area' parameter"));
    }
    let mut opts = SearchOptions::default();
    if let Some(r) = params.radius {
        opts.radius_m = r;
    }

    let query = area.clone();
    let found = tokio::task::spawn_blocking(move || {
        let mut finder = state
            .finder
            .lock()
            .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "finder lock poisoned"))?;
        finder.search_area(&query, &opts).map_err(ApiError::from)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    log::info!(
        "GET /api/search area='{}' -> {} places ({:.1}ms)",
        area,
        found.places.len(),
        start.elapsed().as_secs_f64() * 1000.0,
    );

    Ok(Json(SearchResponse {
        center: found.center,
        gyms: found.places.iter().map(NewGym::from_place).collect(),
    }))
}
