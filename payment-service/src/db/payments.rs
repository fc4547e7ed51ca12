//! PostgreSQL payment store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{NewPayment, Payment, PaymentLog, PaymentStatus};
use sqlx::PgPool;

use super::{PaymentStore, SettleRequest, Settlement, StoreError};

const PAYMENT_COLUMNS: &str = "id, order_id, user_id, amount, currency, payment_method, \
     payment_status, payment_provider, paid_at, created_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: i64,
    user_id: i64,
    amount: f64,
    currency: String,
    payment_method: String,
    payment_status: String,
    payment_provider: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let payment_status = row.payment_status.parse().map_err(StoreError::Corrupt)?;
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            amount: row.amount,
            currency: row.currency,
            payment_method: row.payment_method,
            payment_status,
            payment_provider: row.payment_provider,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    payment_id: i64,
    status: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LogRow> for PaymentLog {
    type Error = StoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(PaymentLog {
            id: row.id,
            payment_id: row.payment_id,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            message: row.message,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn create_if_absent(&self, p: &NewPayment) -> Result<Option<Payment>, StoreError> {
        let now = Utc::now();
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "INSERT INTO payments (order_id, user_id, amount, currency, payment_method,
                payment_status, payment_provider, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
                ON CONFLICT (order_id) DO NOTHING
                RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(p.order_id)
        .bind(p.user_id)
        .bind(p.amount)
        .bind(&p.currency)
        .bind(&p.payment_method)
        .bind(PaymentStatus::Pending.as_str())
        .bind(&p.payment_provider)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_order(&self, order_id: i64) -> Result<Option<Payment>, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn settle(&self, req: SettleRequest<'_>) -> Result<Settlement, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<PaymentRow> = sqlx::query_as(&format!(
            "UPDATE payments
                SET payment_status = $2,
                    payment_provider = COALESCE($3, payment_provider),
                    paid_at = $4,
                    updated_at = $4
                WHERE order_id = $1 AND payment_status <> $2
                RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(req.order_id)
        .bind(PaymentStatus::Paid.as_str())
        .bind(req.provider)
        .bind(req.paid_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            // Nothing moved: either no row or already paid
            let existing: Option<PaymentRow> = sqlx::query_as(&format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
            ))
            .bind(req.order_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.commit().await?;
            return match existing {
                Some(row) => Ok(Settlement::AlreadyPaid(row.try_into()?)),
                None => Ok(Settlement::NotFound),
            };
        };

        sqlx::query(
            "INSERT INTO payment_logs (payment_id, status, message, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(row.id)
        .bind(PaymentStatus::Paid.as_str())
        .bind(req.message)
        .bind(req.paid_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Settlement::Settled(row.try_into()?))
    }

    async fn logs(&self, payment_id: i64) -> Result<Vec<PaymentLog>, StoreError> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, payment_id, status, message, created_at
                FROM payment_logs WHERE payment_id = $1 ORDER BY id",
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PaymentLog::try_from).collect()
    }
}
