//! In-memory payment store

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::models::{NewPayment, Payment, PaymentLog, PaymentStatus};

use super::{PaymentStore, SettleRequest, Settlement, StoreError};

#[derive(Default)]
struct Tables {
    payments: Vec<Payment>,
    logs: Vec<PaymentLog>,
}

/// Same contract as the PostgreSQL store, held in process memory
#[derive(Default)]
pub struct MemoryPaymentStore {
    tables: Mutex<Tables>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment_count(&self) -> usize {
        self.tables.lock().payments.len()
    }

    pub fn log_count(&self) -> usize {
        self.tables.lock().logs.len()
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn create_if_absent(&self, p: &NewPayment) -> Result<Option<Payment>, StoreError> {
        let mut tables = self.tables.lock();
        if tables.payments.iter().any(|x| x.order_id == p.order_id) {
            return Ok(None);
        }
        let payment = Payment {
            id: tables.payments.len() as i64 + 1,
            order_id: p.order_id,
            user_id: p.user_id,
            amount: p.amount,
            currency: p.currency.clone(),
            payment_method: p.payment_method.clone(),
            payment_status: PaymentStatus::Pending,
            payment_provider: p.payment_provider.clone(),
            paid_at: None,
            created_at: Utc::now(),
        };
        tables.payments.push(payment.clone());
        Ok(Some(payment))
    }

    async fn find_by_order(&self, order_id: i64) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .tables
            .lock()
            .payments
            .iter()
            .find(|p| p.order_id == order_id)
            .cloned())
    }

    async fn settle(&self, req: SettleRequest<'_>) -> Result<Settlement, StoreError> {
        let mut tables = self.tables.lock();
        let Some(payment) = tables.payments.iter_mut().find(|p| p.order_id == req.order_id) else {
            return Ok(Settlement::NotFound);
        };
        if payment.payment_status == PaymentStatus::Paid {
            return Ok(Settlement::AlreadyPaid(payment.clone()));
        }

        payment.payment_status = PaymentStatus::Paid;
        if let Some(provider) = req.provider {
            payment.payment_provider = Some(provider.to_string());
        }
        payment.paid_at = Some(req.paid_at);
        let settled = payment.clone();

        let id = tables.logs.len() as i64 + 1;
        tables.logs.push(PaymentLog {
            id,
            payment_id: settled.id,
            status: PaymentStatus::Paid,
            message: req.message.to_string(),
            created_at: req.paid_at,
        });
        Ok(Settlement::Settled(settled))
    }

    async fn logs(&self, payment_id: i64) -> Result<Vec<PaymentLog>, StoreError> {
        Ok(self
            .tables
            .lock()
            .logs
            .iter()
            .filter(|l| l.payment_id == payment_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_payment(order_id: i64) -> NewPayment {
        NewPayment {
            order_id,
            user_id: 12,
            amount: 30.0,
            currency: "PHP".to_string(),
            payment_method: "cod".to_string(),
            payment_provider: None,
        }
    }

    fn settle(order_id: i64) -> SettleRequest<'static> {
        SettleRequest {
            order_id,
            provider: Some("cash-on-delivery"),
            paid_at: Utc::now(),
            message: "COD payment verified",
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent_per_order() {
        let store = MemoryPaymentStore::new();
        let first = store.create_if_absent(&new_payment(1)).await.unwrap();
        assert!(first.is_some());
        assert!(store.create_if_absent(&new_payment(1)).await.unwrap().is_none());
        assert!(store.create_if_absent(&new_payment(2)).await.unwrap().is_some());
        assert_eq!(store.payment_count(), 2);
    }

    #[tokio::test]
    async fn test_settle_transitions_once() {
        let store = MemoryPaymentStore::new();
        assert_eq!(store.settle(settle(1)).await.unwrap(), Settlement::NotFound);

        let created = store.create_if_absent(&new_payment(1)).await.unwrap().unwrap();
        let Settlement::Settled(paid) = store.settle(settle(1)).await.unwrap() else {
            panic!("expected settlement");
        };
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_provider.as_deref(), Some("cash-on-delivery"));
        assert!(paid.paid_at.is_some());

        assert!(matches!(
            store.settle(settle(1)).await.unwrap(),
            Settlement::AlreadyPaid(_)
        ));
        let logs = store.logs(created.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "COD payment verified");
    }

    #[tokio::test]
    async fn test_settle_keeps_provider_when_none_given() {
        let store = MemoryPaymentStore::new();
        let mut p = new_payment(3);
        p.payment_provider = Some("gcash".to_string());
        store.create_if_absent(&p).await.unwrap();

        let req = SettleRequest {
            provider: None,
            ..settle(3)
        };
        let Settlement::Settled(paid) = store.settle(req).await.unwrap() else {
            panic!("expected settlement");
        };
        assert_eq!(paid.payment_provider.as_deref(), Some("gcash"));
    }
}
