//! Payment storage
//!
//! `PgPaymentStore` in production, `MemoryPaymentStore` for tests and for
//! development runs without a database. Both honour the same contract: one
//! payment row per order, and every settlement appends exactly one log entry.

pub mod memory;
pub mod payments;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{NewPayment, Payment, PaymentLog};
use thiserror::Error;

pub use memory::MemoryPaymentStore;
pub use payments::PgPaymentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value no longer parses into the domain type
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result of settling the payment of an order
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Moved to `paid`, one log entry appended
    Settled(Payment),
    /// Was already `paid`, left untouched
    AlreadyPaid(Payment),
    /// No payment row for the order
    NotFound,
}

/// Settlement parameters
#[derive(Debug, Clone, Copy)]
pub struct SettleRequest<'a> {
    pub order_id: i64,
    /// Replaces the stored provider when set
    pub provider: Option<&'a str>,
    pub paid_at: DateTime<Utc>,
    /// Log message recorded with the transition
    pub message: &'a str,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a pending payment unless the order already has one
    ///
    /// Returns `None` when a row for `order_id` already existed.
    async fn create_if_absent(&self, payment: &NewPayment) -> Result<Option<Payment>, StoreError>;

    async fn find_by_order(&self, order_id: i64) -> Result<Option<Payment>, StoreError>;

    /// Mark the order's payment paid and append a log entry, atomically
    async fn settle(&self, req: SettleRequest<'_>) -> Result<Settlement, StoreError>;

    /// Log entries of a payment, oldest first
    async fn logs(&self, payment_id: i64) -> Result<Vec<PaymentLog>, StoreError>;
}
