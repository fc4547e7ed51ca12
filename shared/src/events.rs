//! Order pipeline events
//!
//! JSON shapes carried between the order, inventory and payment services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::message::WireEvent;

/// Queue consumed by the inventory service
pub const ORDER_STOCK_QUEUE: &str = "order_stock_queue";
/// Queue consumed by the payment service
pub const ORDER_CREATED_QUEUE: &str = "order_created_queue";

/// One line of a stock reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub variant_id: i64,
    pub quantity: i32,
}

/// Stock to take off the shelf for a freshly placed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReservationEvent {
    pub order_id: i64,
    pub items: Vec<StockItem>,
}

impl WireEvent for StockReservationEvent {
    const QUEUE: &'static str = ORDER_STOCK_QUEUE;
}

/// A new order that needs a payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub payment_provider: Option<String>,
}

impl WireEvent for OrderCreatedEvent {
    const QUEUE: &'static str = ORDER_CREATED_QUEUE;
}

/// A reconciliation that gave up after the retry ceiling
///
/// Only published when a dead-letter queue is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationFailure {
    pub queue: String,
    pub order_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    pub reason: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

/// Publish a [`ReconciliationFailure`] to an arbitrary (configured) queue
pub async fn publish_failure(
    channel: &dyn crate::message::MessageChannel,
    queue: &str,
    failure: &ReconciliationFailure,
) -> Result<(), crate::message::ChannelError> {
    let payload = serde_json::to_vec(failure)?;
    channel.publish(queue, payload).await
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::decode_event;

    #[test]
    fn test_stock_reservation_wire_shape() {
        let event = StockReservationEvent {
            order_id: 42,
            items: vec![StockItem {
                variant_id: 26,
                quantity: 3,
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"order_id": 42, "items": [{"variant_id": 26, "quantity": 3}]})
        );
    }

    #[test]
    fn test_order_created_empty_provider_is_none() {
        let raw = br#"{"order_id":1,"user_id":2,"amount":30.0,"currency":"PHP","payment_method":"cod","payment_provider":""}"#;
        let event: OrderCreatedEvent = decode_event(raw).unwrap();
        assert_eq!(event.payment_provider, None);

        let raw = br#"{"order_id":1,"user_id":2,"amount":30.0,"currency":"PHP","payment_method":"cod"}"#;
        let event: OrderCreatedEvent = decode_event(raw).unwrap();
        assert_eq!(event.payment_provider, None);

        let raw = br#"{"order_id":1,"user_id":2,"amount":30.0,"currency":"PHP","payment_method":"online","payment_provider":"gcash"}"#;
        let event: OrderCreatedEvent = decode_event(raw).unwrap();
        assert_eq!(event.payment_provider.as_deref(), Some("gcash"));
    }

    #[test]
    fn test_queue_names() {
        assert_eq!(StockReservationEvent::QUEUE, "order_stock_queue");
        assert_eq!(OrderCreatedEvent::QUEUE, "order_created_queue");
    }

    #[test]
    fn test_failure_omits_missing_variant() {
        let failure = ReconciliationFailure {
            queue: ORDER_CREATED_QUEUE.to_string(),
            order_id: 9,
            variant_id: None,
            reason: "gateway down".to_string(),
            attempts: 3,
            failed_at: Utc::now(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert!(json.get("variant_id").is_none());
        assert_eq!(json["attempts"], 3);
    }
}
