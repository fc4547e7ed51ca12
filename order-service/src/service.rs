//! Order emission path
//!
//! Persists a new order through the mutation gateway and announces it to the
//! inventory and payment services. Publishing happens after persistence and
//! is best-effort: a failed publish is logged, the order stays persisted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::auth::{CurrentUser, Role};
use shared::events::{OrderCreatedEvent, StockItem, StockReservationEvent};
use shared::message::{MessageChannel, publish_event};
use shared::models::{Order, OrderItem, OrderStatus, PAYMENT_METHOD_COD, PaymentStatus};
use shared::mutation::MutationExecutor;
use shared::mutation::documents::{
    INSERT_ORDER, UPDATE_ORDER_STATUS, insert_order_vars, inserted_order_id, order_was_updated,
    update_order_status_vars,
};

use crate::error::{OrderError, OrderResult};
use crate::money;

/// Order line as sent by the client (`subtotal` is ignored)
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    #[serde(default)]
    pub product_id: i64,
    pub variant_id: i64,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub price: f64,
    pub quantity: i32,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// `POST /orders` body; the buyer always comes from the token
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub seller_id: i64,
    #[serde(default)]
    pub seller_username: String,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(alias = "items")]
    pub order_items: Vec<OrderItemInput>,
}

/// Result of a successful placement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub id: i64,
    pub total_amount: f64,
}

/// `PATCH /orders/status` body
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub order_id: i64,
    pub status: String,
}

#[derive(Clone)]
pub struct OrderService {
    executor: Arc<dyn MutationExecutor>,
    channel: Arc<dyn MessageChannel>,
    currency: String,
}

impl OrderService {
    pub fn new(
        executor: Arc<dyn MutationExecutor>,
        channel: Arc<dyn MessageChannel>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            channel,
            currency: currency.into(),
        }
    }

    /// Validate, price, persist, then publish stock and payment events
    pub async fn place_order(
        &self,
        req: CreateOrderRequest,
        buyer: &CurrentUser,
    ) -> OrderResult<PlacedOrder> {
        let order = build_order(req, buyer)?;

        let data = self
            .executor
            .execute(INSERT_ORDER, insert_order_vars(&order))
            .await
            .map_err(|e| {
                tracing::error!(buyer_id = buyer.id, error = %e, "Failed to insert order");
                OrderError::PersistenceFailed(e.to_string())
            })?;
        let id = inserted_order_id(&data).ok_or_else(|| {
            OrderError::PersistenceFailed("insert_orders_one returned no id".to_string())
        })?;

        tracing::info!(
            order_id = id,
            buyer_id = buyer.id,
            items = order.order_items.len(),
            total = order.total_amount,
            "Order persisted"
        );

        self.announce(id, &order).await;

        Ok(PlacedOrder {
            id,
            total_amount: order.total_amount,
        })
    }

    async fn announce(&self, order_id: i64, order: &Order) {
        let stock = StockReservationEvent {
            order_id,
            items: order
                .order_items
                .iter()
                .map(|i| StockItem {
                    variant_id: i.variant_id,
                    quantity: i.quantity,
                })
                .collect(),
        };
        match publish_event(self.channel.as_ref(), &stock).await {
            Ok(()) => tracing::info!(
                order_id,
                items = stock.items.len(),
                "Stock reservation published"
            ),
            Err(e) => tracing::error!(
                order_id,
                error = %e,
                "Failed to publish stock reservation, stock will not be reconciled"
            ),
        }

        let created = OrderCreatedEvent {
            order_id,
            user_id: order.buyer_id,
            amount: order.total_amount,
            currency: self.currency.clone(),
            payment_method: order.payment_method.clone(),
            payment_provider: None,
        };
        match publish_event(self.channel.as_ref(), &created).await {
            Ok(()) => tracing::info!(order_id, "Order created event published"),
            Err(e) => tracing::error!(
                order_id,
                error = %e,
                "Failed to publish order created event, payment will not be recorded"
            ),
        }
    }

    /// Seller/admin status change, not retried (caller is waiting)
    pub async fn update_status(
        &self,
        req: UpdateStatusRequest,
        user: &CurrentUser,
    ) -> Result<OrderStatus, shared::AppError> {
        user.require_role(&[Role::Seller, Role::Admin])?;

        let status: OrderStatus = req.status.parse().map_err(OrderError::InvalidStatus)?;

        let data = self
            .executor
            .execute(UPDATE_ORDER_STATUS, update_order_status_vars(req.order_id, status))
            .await
            .map_err(OrderError::from)?;

        if !order_was_updated(&data) {
            return Err(OrderError::NotFound(req.order_id).into());
        }

        tracing::info!(
            order_id = req.order_id,
            %status,
            user_id = user.id,
            "Order status updated"
        );
        Ok(status)
    }
}

/// Turn a request into a pending order with server-computed money fields
pub fn build_order(req: CreateOrderRequest, buyer: &CurrentUser) -> OrderResult<Order> {
    if req.order_items.is_empty() {
        return Err(OrderError::Empty);
    }

    let mut items = Vec::with_capacity(req.order_items.len());
    for (index, input) in req.order_items.into_iter().enumerate() {
        money::validate_line(index, input.price, input.quantity)?;
        items.push(OrderItem {
            subtotal: money::to_f64(money::line_subtotal(input.price, input.quantity)),
            product_id: input.product_id,
            variant_id: input.variant_id,
            product_name: input.product_name,
            variant_name: input.variant_name,
            size: input.size,
            color: input.color,
            price: input.price,
            quantity: input.quantity,
            image_url: input.image_url,
        });
    }

    let total_amount = money::order_total(items.iter().map(|i| (i.price, i.quantity)));

    Ok(Order {
        id: None,
        buyer_id: buyer.id,
        buyer_name: req
            .buyer_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| buyer.username.clone()),
        seller_id: req.seller_id,
        seller_username: req.seller_username,
        status: OrderStatus::Pending,
        total_amount,
        payment_method: req
            .payment_method
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| PAYMENT_METHOD_COD.to_string()),
        payment_status: PaymentStatus::Pending,
        shipping_method: req.shipping_method,
        shipping_address: req.shipping_address,
        contact_number: req.contact_number,
        created_at: None,
        order_items: items,
    })
}
