//! Payment Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::PaymentStatus;

/// One payment per order (`order_id` is unique)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    /// Amount in currency unit
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_provider: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a payment row
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub order_id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub payment_provider: Option<String>,
}

/// Append-only audit entry for a payment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentLog {
    pub id: i64,
    pub payment_id: i64,
    pub status: PaymentStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
