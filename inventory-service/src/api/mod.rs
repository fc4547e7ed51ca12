//! API routes for the inventory service

pub mod health;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
