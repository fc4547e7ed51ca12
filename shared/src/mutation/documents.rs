//! GraphQL mutation documents and their variable builders

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::models::{Order, OrderStatus, PaymentStatus};

/// Insert an order together with its items, returns the new id
pub const INSERT_ORDER: &str = r#"
mutation CreateOrder($order: orders_insert_input!) {
  insert_orders_one(object: $order) {
    id
  }
}"#;

/// Add `amount` (negative to decrement) to a variant's stock
pub const DECREMENT_STOCK: &str = r#"
mutation UpdateStock($variant_id: Int!, $quantity: Int!) {
  update_product_variants_by_pk(
    pk_columns: { id: $variant_id },
    _inc: { stock_quantity: $quantity }
  ) {
    id
    stock_quantity
  }
}"#;

/// Set an order's payment status and verification time
pub const MARK_ORDER_PAID: &str = r#"
mutation UpdateOrderPayment($id: Int!, $status: String!, $verifiedAt: timestamp!) {
  update_orders_by_pk(
    pk_columns: { id: $id },
    _set: { payment_status: $status, payment_verified_at: $verifiedAt }
  ) {
    id
    payment_status
    payment_verified_at
  }
}"#;

/// Set an order's fulfilment status
pub const UPDATE_ORDER_STATUS: &str = r#"
mutation UpdateOrderStatus($id: Int!, $status: String!) {
  update_orders_by_pk(
    pk_columns: { id: $id },
    _set: { status: $status }
  ) {
    id
    status
  }
}"#;

pub fn insert_order_vars(order: &Order) -> Value {
    json!({
        "order": {
            "buyer_id": order.buyer_id,
            "buyer_name": order.buyer_name,
            "seller_id": order.seller_id,
            "seller_username": order.seller_username,
            "status": order.status.as_str(),
            "total_amount": order.total_amount,
            "payment_method": order.payment_method,
            "payment_status": order.payment_status.as_str(),
            "shipping_method": order.shipping_method,
            "shipping_address": order.shipping_address,
            "contact_number": order.contact_number,
            "order_items": {
                "data": order.order_items,
            },
        }
    })
}

/// Decrement is expressed as a negative increment
pub fn decrement_stock_vars(variant_id: i64, quantity: i32) -> Value {
    json!({ "variant_id": variant_id, "quantity": -quantity })
}

pub fn mark_order_paid_vars(order_id: i64, verified_at: DateTime<Utc>) -> Value {
    json!({
        "id": order_id,
        "status": PaymentStatus::Paid.as_str(),
        "verifiedAt": verified_at.to_rfc3339(),
    })
}

pub fn update_order_status_vars(order_id: i64, status: OrderStatus) -> Value {
    json!({ "id": order_id, "status": status.as_str() })
}

/// Pull `insert_orders_one.id` out of an insert response
pub fn inserted_order_id(data: &Value) -> Option<i64> {
    data.get("insert_orders_one")?.get("id")?.as_i64()
}

/// Whether `update_orders_by_pk` matched a row (null when the id is unknown)
pub fn order_was_updated(data: &Value) -> bool {
    data.get("update_orders_by_pk")
        .is_some_and(|row| !row.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement_is_negative_increment() {
        let vars = decrement_stock_vars(26, 3);
        assert_eq!(vars["variant_id"], 26);
        assert_eq!(vars["quantity"], -3);
    }

    #[test]
    fn test_mark_order_paid_vars() {
        let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let vars = mark_order_paid_vars(7, at);
        assert_eq!(vars["id"], 7);
        assert_eq!(vars["status"], "paid");
        assert_eq!(vars["verifiedAt"], "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_inserted_order_id() {
        let data = json!({"insert_orders_one": {"id": 99}});
        assert_eq!(inserted_order_id(&data), Some(99));
        assert_eq!(inserted_order_id(&json!({"insert_orders_one": null})), None);
        assert_eq!(inserted_order_id(&json!({})), None);
    }

    #[test]
    fn test_order_was_updated() {
        assert!(order_was_updated(&json!({"update_orders_by_pk": {"id": 1}})));
        assert!(!order_was_updated(&json!({"update_orders_by_pk": null})));
        assert!(!order_was_updated(&json!({})));
    }
}
