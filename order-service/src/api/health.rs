use axum::Json;

/// GET /health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "order-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
