//! Stock reconciliation consumer
//!
//! Each stock reservation message moves through
//! `Received -> Parsed -> Applying -> {Done, Failed}`. Lines are reconciled
//! independently: one line exhausting its retries does not roll back or
//! block the others, and the message is consumed whatever the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use shared::events::{ReconciliationFailure, StockReservationEvent, publish_failure};
use shared::message::{MessageChannel, MessageHandler, WireEvent, decode_event};
use shared::mutation::documents::{DECREMENT_STOCK, decrement_stock_vars};
use shared::mutation::{MutationExecutor, RetryPolicy, execute_with_retry};

/// Per-message state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    Received,
    Parsed,
    Applying,
    /// Every line is reconciled (or had nothing to do)
    Done,
    /// Undecodable payload, or at least one line gave up
    Failed,
}

/// Terminal outcome of one reservation line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Done { attempts: u32 },
    /// Applied by an earlier delivery of the same message
    AlreadyApplied,
    /// Non-positive quantity, nothing to decrement
    Skipped,
    Failed { attempts: u32, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub variant_id: i64,
    pub quantity: i32,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// What happened to one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// `None` for a poison message
    pub order_id: Option<i64>,
    pub state: MessageState,
    pub items: Vec<ItemReport>,
}

impl ReconciliationReport {
    fn poison() -> Self {
        Self {
            order_id: None,
            state: MessageState::Failed,
            items: Vec::new(),
        }
    }

    pub fn failed_items(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Failed { .. }))
    }
}

/// `(order_id, line position, variant_id)`
///
/// The position keeps two lines for the same variant apart; a redelivered
/// message carries its lines in the same order.
type LedgerKey = (i64, usize, i64);

/// Applies stock reservations through the mutation gateway
pub struct StockReconciler {
    executor: Arc<dyn MutationExecutor>,
    policy: RetryPolicy,
    applied: DashMap<LedgerKey, Instant>,
    dead_letter: Option<(Arc<dyn MessageChannel>, String)>,
}

impl StockReconciler {
    pub fn new(executor: Arc<dyn MutationExecutor>, policy: RetryPolicy) -> Self {
        Self {
            executor,
            policy,
            applied: DashMap::new(),
            dead_letter: None,
        }
    }

    /// Publish exhausted lines to `queue`
    pub fn with_dead_letter(mut self, channel: Arc<dyn MessageChannel>, queue: impl Into<String>) -> Self {
        self.dead_letter = Some((channel, queue.into()));
        self
    }

    /// Lines remembered as applied
    pub fn ledger_len(&self) -> usize {
        self.applied.len()
    }

    /// Forget applied lines older than `max_age`
    pub fn prune_ledger(&self, max_age: Duration) -> usize {
        let before = self.applied.len();
        self.applied.retain(|_, applied_at| applied_at.elapsed() < max_age);
        before - self.applied.len()
    }

    /// Reconcile one raw message
    pub async fn reconcile(&self, payload: &[u8]) -> ReconciliationReport {
        // Received
        let event: StockReservationEvent = match decode_event(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    queue = StockReservationEvent::QUEUE,
                    error = %e,
                    bytes = payload.len(),
                    "Dropping undecodable stock reservation"
                );
                return ReconciliationReport::poison();
            }
        };

        // Parsed
        let order_id = event.order_id;
        tracing::info!(order_id, items = event.items.len(), "Stock reservation received");

        // Applying
        let mut items = Vec::with_capacity(event.items.len());
        for (position, item) in event.items.iter().enumerate() {
            let outcome = self.apply(order_id, position, item.variant_id, item.quantity).await;
            items.push(ItemReport {
                variant_id: item.variant_id,
                quantity: item.quantity,
                outcome,
            });
        }

        let state = if items
            .iter()
            .any(|i| matches!(i.outcome, ItemOutcome::Failed { .. }))
        {
            MessageState::Failed
        } else {
            MessageState::Done
        };

        ReconciliationReport {
            order_id: Some(order_id),
            state,
            items,
        }
    }

    async fn apply(&self, order_id: i64, position: usize, variant_id: i64, quantity: i32) -> ItemOutcome {
        if quantity <= 0 {
            tracing::warn!(order_id, variant_id, quantity, "Invalid quantity, skipping");
            return ItemOutcome::Skipped;
        }

        let key = (order_id, position, variant_id);
        if self.applied.contains_key(&key) {
            tracing::info!(order_id, variant_id, "Line already applied, skipping redelivery");
            return ItemOutcome::AlreadyApplied;
        }

        match execute_with_retry(
            self.executor.as_ref(),
            &self.policy,
            DECREMENT_STOCK,
            decrement_stock_vars(variant_id, quantity),
        )
        .await
        {
            Ok(retried) => {
                self.applied.insert(key, Instant::now());
                tracing::info!(
                    order_id,
                    variant_id,
                    quantity,
                    attempts = retried.attempts,
                    "Stock decremented"
                );
                ItemOutcome::Done {
                    attempts: retried.attempts,
                }
            }
            Err(exhausted) => {
                tracing::error!(
                    order_id,
                    variant_id,
                    quantity,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "Reconciliation failed, stock left unchanged"
                );
                let reason = exhausted.last_error.to_string();
                self.dead_letter(order_id, variant_id, &reason, exhausted.attempts)
                    .await;
                ItemOutcome::Failed {
                    attempts: exhausted.attempts,
                    reason,
                }
            }
        }
    }

    async fn dead_letter(&self, order_id: i64, variant_id: i64, reason: &str, attempts: u32) {
        let Some((channel, queue)) = &self.dead_letter else {
            return;
        };
        let failure = ReconciliationFailure {
            queue: StockReservationEvent::QUEUE.to_string(),
            order_id,
            variant_id: Some(variant_id),
            reason: reason.to_string(),
            attempts,
            failed_at: Utc::now(),
        };
        if let Err(e) = publish_failure(channel.as_ref(), queue, &failure).await {
            tracing::error!(order_id, variant_id, error = %e, "Failed to dead-letter item");
        }
    }
}

#[async_trait]
impl MessageHandler for StockReconciler {
    async fn handle(&self, payload: &[u8]) {
        let report = self.reconcile(payload).await;
        let failed = report.failed_items().count();
        match report.state {
            MessageState::Done => tracing::info!(
                order_id = ?report.order_id,
                items = report.items.len(),
                "Stock reservation reconciled"
            ),
            _ => {
                let detail = serde_json::to_string(&report).unwrap_or_default();
                tracing::warn!(
                    order_id = ?report.order_id,
                    items = report.items.len(),
                    failed,
                    report = %detail,
                    "Stock reservation finished with failures"
                );
            }
        }
    }
}
