//! POST /cod-paid

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use shared::auth::{CurrentUser, Role};
use shared::error::AppResult;
use shared::models::Payment;

use crate::cod::confirm_cod;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CodPaidRequest {
    pub order_id: i64,
}

/// Seller or admin confirms cash was collected
pub async fn cod_paid(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CodPaidRequest>,
) -> AppResult<Json<Payment>> {
    user.require_role(&[Role::Seller, Role::Admin])?;

    let payment = confirm_cod(state.store.as_ref(), req.order_id).await?;
    shared::audit_log!(user.id, "cod_confirmed", req.order_id, payment.id);
    Ok(Json(payment))
}
