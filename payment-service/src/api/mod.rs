//! API routes for the payment service

pub mod cod;
pub mod health;
pub mod webhook;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/cod-paid", post(cod::cod_paid))
        .route("/publish-order-created", post(webhook::publish_order_created))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
