mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::gym::Gym;
use crate::places::{GymFinder, MapsClient};

pub use state::AppState;

pub fn build_router(gyms: Vec<Gym>, finder: GymFinder<MapsClient>) -> Router {
    let state = Arc::new(AppState {
        gyms,
        finder: Mutex::new(finder),
    });

    Router::new()
        .route("/api/distance", get(handlers::distance))
        .route("/api/format", get(handlers::format))
        .route("/api/rank", post(handlers::rank))
        .route("/api/gyms", get(handlers::gyms))
        .route("/api/search", get(handlers::search))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, app: Router) -> std::io::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("listening on http://{}", addr);
    eprintln!("  Gym locator API listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
