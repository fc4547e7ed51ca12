//! Payment reconciliation consumer
//!
//! Records one pending payment per order-created event. Orders paid online
//! are then marked paid on the gateway, and the local row is settled once
//! the gateway accepted it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::events::{OrderCreatedEvent, ReconciliationFailure, publish_failure};
use shared::message::{MessageChannel, MessageHandler, WireEvent, decode_event};
use shared::models::{NewPayment, settles_immediately};
use shared::mutation::documents::{MARK_ORDER_PAID, mark_order_paid_vars};
use shared::mutation::{MutationExecutor, RetryPolicy, execute_with_retry};

use crate::db::{PaymentStore, SettleRequest, Settlement};

/// Log message for an online settlement
pub const ONLINE_SETTLED_MESSAGE: &str = "Online payment confirmed";

/// What happened to one order-created message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Undecodable payload, dropped
    Poison,
    /// A payment for this order already exists, nothing done
    AlreadyRecorded,
    /// Payment recorded as pending (cash on delivery or deferred)
    Recorded,
    /// Recorded, marked paid on the gateway and settled locally
    Settled { attempts: u32 },
    /// Recorded, but the gateway never accepted the paid mark
    SettlementFailed { attempts: u32, reason: String },
    /// The payment row could not be written
    StoreFailed(String),
}

pub struct PaymentReconciler {
    store: Arc<dyn PaymentStore>,
    executor: Arc<dyn MutationExecutor>,
    policy: RetryPolicy,
    dead_letter: Option<(Arc<dyn MessageChannel>, String)>,
}

impl PaymentReconciler {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        executor: Arc<dyn MutationExecutor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            executor,
            policy,
            dead_letter: None,
        }
    }

    /// Publish failed settlements to `queue`
    pub fn with_dead_letter(mut self, channel: Arc<dyn MessageChannel>, queue: impl Into<String>) -> Self {
        self.dead_letter = Some((channel, queue.into()));
        self
    }

    pub async fn reconcile(&self, payload: &[u8]) -> PaymentOutcome {
        let event: OrderCreatedEvent = match decode_event(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    queue = OrderCreatedEvent::QUEUE,
                    error = %e,
                    bytes = payload.len(),
                    "Dropping undecodable order created event"
                );
                return PaymentOutcome::Poison;
            }
        };
        let order_id = event.order_id;

        let new_payment = NewPayment {
            order_id,
            user_id: event.user_id,
            amount: event.amount,
            currency: event.currency.clone(),
            payment_method: event.payment_method.clone(),
            payment_provider: event.payment_provider.clone(),
        };
        match self.store.create_if_absent(&new_payment).await {
            Ok(Some(payment)) => tracing::info!(
                order_id,
                payment_id = payment.id,
                method = %payment.payment_method,
                amount = payment.amount,
                "Payment recorded"
            ),
            Ok(None) => {
                tracing::info!(order_id, "Payment already recorded, skipping duplicate event");
                return PaymentOutcome::AlreadyRecorded;
            }
            Err(e) => {
                tracing::error!(order_id, error = %e, "Failed to record payment");
                return PaymentOutcome::StoreFailed(e.to_string());
            }
        }

        if !settles_immediately(&event.payment_method) {
            return PaymentOutcome::Recorded;
        }

        let paid_at = Utc::now();
        match execute_with_retry(
            self.executor.as_ref(),
            &self.policy,
            MARK_ORDER_PAID,
            mark_order_paid_vars(order_id, paid_at),
        )
        .await
        {
            Ok(retried) => {
                self.settle_locally(&event, paid_at).await;
                tracing::info!(order_id, attempts = retried.attempts, "Order marked paid");
                PaymentOutcome::Settled {
                    attempts: retried.attempts,
                }
            }
            Err(exhausted) => {
                tracing::error!(
                    order_id,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "Failed to mark order paid, payment stays pending"
                );
                let reason = exhausted.last_error.to_string();
                self.dead_letter(order_id, &reason, exhausted.attempts).await;
                PaymentOutcome::SettlementFailed {
                    attempts: exhausted.attempts,
                    reason,
                }
            }
        }
    }

    async fn settle_locally(&self, event: &OrderCreatedEvent, paid_at: chrono::DateTime<Utc>) {
        let req = SettleRequest {
            order_id: event.order_id,
            provider: event.payment_provider.as_deref(),
            paid_at,
            message: ONLINE_SETTLED_MESSAGE,
        };
        match self.store.settle(req).await {
            Ok(Settlement::Settled(_)) | Ok(Settlement::AlreadyPaid(_)) => {}
            Ok(Settlement::NotFound) => {
                tracing::warn!(order_id = event.order_id, "Payment row vanished before settlement");
            }
            Err(e) => tracing::error!(
                order_id = event.order_id,
                error = %e,
                "Order paid on gateway but local payment not settled"
            ),
        }
    }

    async fn dead_letter(&self, order_id: i64, reason: &str, attempts: u32) {
        let Some((channel, queue)) = &self.dead_letter else {
            return;
        };
        let failure = ReconciliationFailure {
            queue: OrderCreatedEvent::QUEUE.to_string(),
            order_id,
            variant_id: None,
            reason: reason.to_string(),
            attempts,
            failed_at: Utc::now(),
        };
        if let Err(e) = publish_failure(channel.as_ref(), queue, &failure).await {
            tracing::error!(order_id, error = %e, "Failed to dead-letter settlement");
        }
    }
}

#[async_trait]
impl MessageHandler for PaymentReconciler {
    async fn handle(&self, payload: &[u8]) {
        let outcome = self.reconcile(payload).await;
        tracing::debug!(?outcome, "Order created event handled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryPaymentStore;
    use serde_json::json;
    use shared::mutation::RecordingExecutor;
    use std::time::Duration;

    fn reconciler(store: Arc<MemoryPaymentStore>, executor: Arc<RecordingExecutor>) -> PaymentReconciler {
        PaymentReconciler::new(store, executor, RetryPolicy::new(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_poison_creates_nothing() {
        let store = Arc::new(MemoryPaymentStore::new());
        let executor = Arc::new(RecordingExecutor::always_ok(json!({})));
        let r = reconciler(store.clone(), executor.clone());

        assert_eq!(r.reconcile(b"[]").await, PaymentOutcome::Poison);
        assert_eq!(r.reconcile(br#"{"order_id": 1}"#).await, PaymentOutcome::Poison);
        assert_eq!(store.payment_count(), 0);
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cod_is_recorded_pending_without_gateway_call() {
        let store = Arc::new(MemoryPaymentStore::new());
        let executor = Arc::new(RecordingExecutor::always_ok(json!({})));
        let r = reconciler(store.clone(), executor.clone());

        let payload = br#"{"order_id":7,"user_id":12,"amount":30.0,"currency":"PHP","payment_method":"cod","payment_provider":""}"#;
        assert_eq!(r.reconcile(payload).await, PaymentOutcome::Recorded);

        let payment = store.find_by_order(7).await.unwrap().unwrap();
        assert_eq!(payment.payment_provider, None);
        assert_eq!(executor.call_count(), 0);
    }
}
