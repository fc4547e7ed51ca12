//! POST /publish-order-created

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use shared::error::{AppError, AppResult};
use shared::message::publish_event;

use crate::bridge::OrderInsertedTrigger;
use crate::error::PaymentError;
use crate::state::AppState;

/// Header carrying the shared webhook secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

pub async fn publish_order_created(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(trigger): Json<OrderInsertedTrigger>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if let Some(expected) = &state.webhook_secret {
        let given = headers
            .get(WEBHOOK_SECRET_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        if !constant_time_eq(given, expected.as_bytes()) {
            shared::security_log!(WARN, "webhook_rejected", reason = "bad secret");
            return Err(AppError::unauthorized());
        }
    }

    let event = trigger.into_event(&state.default_currency);
    publish_event(state.channel.as_ref(), &event)
        .await
        .map_err(PaymentError::from)?;

    tracing::info!(
        order_id = event.order_id,
        method = %event.payment_method,
        "Forwarded order created event"
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "published", "order_id": event.order_id })),
    ))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hook-secret", b"hook-secret"));
        assert!(!constant_time_eq(b"hook-secret", b"hook-secreT"));
        assert!(!constant_time_eq(b"hook", b"hook-secret"));
        assert!(!constant_time_eq(b"", b"hook-secret"));
    }
}
