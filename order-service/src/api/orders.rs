//! Order API handlers
//!
//! POST  /orders: place an order (buyer from token)
//! PATCH /orders/status: change fulfilment status (seller/admin)

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use shared::auth::CurrentUser;
use shared::error::AppResult;

use crate::service::{CreateOrderRequest, UpdateStatusRequest};
use crate::state::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let placed = state.orders.place_order(req, &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "order created",
            "id": placed.id,
            "total_amount": placed.total_amount,
        })),
    ))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<Value>> {
    let order_id = req.order_id;
    let status = state.orders.update_status(req, &user).await?;
    Ok(Json(json!({ "id": order_id, "status": status })))
}
