//! Application state for the order service

use std::sync::Arc;

use axum::extract::FromRef;
use shared::auth::JwtService;
use shared::message::MessageChannel;
use shared::mutation::MutationExecutor;

use crate::service::OrderService;

/// Shared application state
///
/// Collaborators are constructed by the caller and passed in, so tests can
/// swap the broker and gateway for in-process doubles.
#[derive(Clone)]
pub struct AppState {
    pub jwt: JwtService,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(
        jwt: JwtService,
        executor: Arc<dyn MutationExecutor>,
        channel: Arc<dyn MessageChannel>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            jwt,
            orders: OrderService::new(executor, channel, currency),
        }
    }
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
