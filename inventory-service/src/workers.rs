//! Background workers of the inventory service

use std::sync::Arc;
use std::time::Duration;

use shared::events::StockReservationEvent;
use shared::message::{AckMode, MessageChannel, WireEvent, run_consumer};
use shared::tasks::{BackgroundTasks, TaskKind};

use crate::reconciler::StockReconciler;

/// How often the redelivery ledger is pruned
const LEDGER_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Register the stock consumer and the ledger pruner
pub fn register(
    tasks: &mut BackgroundTasks,
    channel: Arc<dyn MessageChannel>,
    ack_mode: AckMode,
    reconciler: Arc<StockReconciler>,
    ledger_ttl: Duration,
) {
    let token = tasks.shutdown_token();
    tasks.spawn(
        StockReservationEvent::QUEUE,
        TaskKind::Consumer,
        run_consumer(
            channel,
            StockReservationEvent::QUEUE.to_string(),
            ack_mode,
            reconciler.clone(),
            token.clone(),
        ),
    );

    tasks.spawn("ledger_prune", TaskKind::Periodic, async move {
        let mut interval = tokio::time::interval(LEDGER_PRUNE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let pruned = reconciler.prune_ledger(ledger_ttl);
                    if pruned > 0 {
                        tracing::debug!(pruned, remaining = reconciler.ledger_len(), "Pruned redelivery ledger");
                    }
                }
            }
        }
    });
}
