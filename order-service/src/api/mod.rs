//! API routes for the order service

pub mod health;
pub mod orders;

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/orders", post(orders::create_order))
        .route("/orders/status", patch(orders::update_order_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
