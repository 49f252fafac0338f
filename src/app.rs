use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{analytics, classification, dataset, elasticity, forecast, health, imports};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/dataset", dataset::router())
        .nest("/api/forecast", forecast::router())
        .nest("/api/classification", classification::router())
        .nest("/api/elasticity", elasticity::router())
        .nest("/api/analytics", analytics::router())
        .nest("/api/imports", imports::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
