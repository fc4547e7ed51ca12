//! Application state for the payment service

use std::sync::Arc;

use axum::extract::FromRef;
use shared::auth::JwtService;
use shared::message::MessageChannel;

use crate::db::PaymentStore;

#[derive(Clone)]
pub struct AppState {
    pub jwt: JwtService,
    pub store: Arc<dyn PaymentStore>,
    /// Used by the webhook bridge to republish order created events
    pub channel: Arc<dyn MessageChannel>,
    pub default_currency: String,
    pub webhook_secret: Option<String>,
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
