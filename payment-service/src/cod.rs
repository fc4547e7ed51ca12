//! Cash-on-delivery confirmation

use chrono::Utc;
use shared::models::Payment;

use crate::db::{PaymentStore, SettleRequest, Settlement};
use crate::error::{PaymentError, PaymentResult};

pub const COD_PROVIDER: &str = "cash-on-delivery";
pub const COD_VERIFIED_MESSAGE: &str = "COD payment verified";

/// Mark the order's payment paid after cash was collected
///
/// Confirming an already-paid payment returns it unchanged and writes no
/// new log entry.
pub async fn confirm_cod(store: &dyn PaymentStore, order_id: i64) -> PaymentResult<Payment> {
    let settlement = store
        .settle(SettleRequest {
            order_id,
            provider: Some(COD_PROVIDER),
            paid_at: Utc::now(),
            message: COD_VERIFIED_MESSAGE,
        })
        .await?;

    match settlement {
        Settlement::Settled(payment) => {
            tracing::info!(order_id, payment_id = payment.id, "COD payment verified");
            Ok(payment)
        }
        Settlement::AlreadyPaid(payment) => {
            tracing::info!(order_id, payment_id = payment.id, "COD payment already verified");
            Ok(payment)
        }
        Settlement::NotFound => {
            tracing::warn!(order_id, "COD confirmation for unknown order");
            Err(PaymentError::OrderNotFound(order_id))
        }
    }
}
