//! Order-created webhook bridge
//!
//! The mutation gateway fires an event trigger when an order row is
//! inserted; the bridge turns it into an order created event on the queue.

use serde::Deserialize;
use shared::events::OrderCreatedEvent;

/// Event trigger body, only the fields we forward
#[derive(Debug, Deserialize)]
pub struct OrderInsertedTrigger {
    pub event: TriggerEvent,
}

#[derive(Debug, Deserialize)]
pub struct TriggerEvent {
    pub data: TriggerData,
}

#[derive(Debug, Deserialize)]
pub struct TriggerData {
    pub new: InsertedOrder,
}

#[derive(Debug, Deserialize)]
pub struct InsertedOrder {
    pub id: i64,
    pub buyer_id: i64,
    pub total_amount: f64,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_provider: Option<String>,
}

impl OrderInsertedTrigger {
    pub fn into_event(self, currency: &str) -> OrderCreatedEvent {
        let order = self.event.data.new;
        OrderCreatedEvent {
            order_id: order.id,
            user_id: order.buyer_id,
            amount: order.total_amount,
            currency: currency.to_string(),
            payment_method: order.payment_method,
            payment_provider: order.payment_provider.filter(|p| !p.is_empty()),
        }
    }
}
