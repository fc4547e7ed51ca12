use axum::Json;
use axum::extract::State;

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "inventory-service",
        "version": env!("CARGO_PKG_VERSION"),
        "ledger_entries": state.reconciler.ledger_len(),
    }))
}
