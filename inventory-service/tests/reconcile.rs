use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use inventory_service::reconciler::{ItemOutcome, MessageState, StockReconciler};
use inventory_service::workers;
use shared::events::{ReconciliationFailure, StockItem, StockReservationEvent};
use shared::message::{AckMode, MemoryChannel, MessageChannel, WireEvent, publish_event};
use shared::mutation::{MutationError, RecordingExecutor, RetryPolicy};
use shared::tasks::BackgroundTasks;

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5))
}

fn stock_ok() -> RecordingExecutor {
    RecordingExecutor::always_ok(json!({"update_product_variants_by_pk": {"id": 26, "stock_quantity": 7}}))
}

/// Fails every call for `variant`, answers the rest
fn failing_for(variant: i64) -> RecordingExecutor {
    RecordingExecutor::new(move |_, _, vars| {
        if vars["variant_id"] == variant {
            Err(MutationError::Transport("connection reset".to_string()))
        } else {
            Ok(json!({"update_product_variants_by_pk": {"id": vars["variant_id"].clone()}}))
        }
    })
}

fn message(order_id: i64, items: &[(i64, i32)]) -> Vec<u8> {
    serde_json::to_vec(&StockReservationEvent {
        order_id,
        items: items
            .iter()
            .map(|&(variant_id, quantity)| StockItem { variant_id, quantity })
            .collect(),
    })
    .unwrap()
}

fn variables_for(executor: &RecordingExecutor, variant: i64) -> Vec<Value> {
    executor
        .calls()
        .into_iter()
        .map(|c| c.variables)
        .filter(|v| v["variant_id"] == variant)
        .collect()
}

#[tokio::test]
async fn decrements_stock_for_each_line() {
    let executor = Arc::new(stock_ok());
    let reconciler = StockReconciler::new(executor.clone(), policy());

    let report = reconciler.reconcile(&message(501, &[(26, 3)])).await;

    assert_eq!(report.order_id, Some(501));
    assert_eq!(report.state, MessageState::Done);
    assert_eq!(report.items[0].outcome, ItemOutcome::Done { attempts: 1 });

    let calls = executor.calls_containing("update_product_variants_by_pk");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].variables, json!({"variant_id": 26, "quantity": -3}));
}

#[tokio::test]
async fn transient_failure_recovers_within_budget() {
    let executor = Arc::new(RecordingExecutor::fail_then_ok(2, json!({"update_product_variants_by_pk": {"id": 26}})));
    let reconciler = StockReconciler::new(executor.clone(), policy());

    let report = reconciler.reconcile(&message(8, &[(26, 1)])).await;
    assert_eq!(report.state, MessageState::Done);
    assert_eq!(report.items[0].outcome, ItemOutcome::Done { attempts: 3 });
    assert_eq!(executor.call_count(), 3);
}

#[tokio::test]
async fn exhausted_line_does_not_block_the_rest() {
    let executor = Arc::new(failing_for(26));
    let reconciler = StockReconciler::new(executor.clone(), policy());

    let report = reconciler.reconcile(&message(9, &[(26, 3), (27, 1)])).await;

    assert_eq!(report.state, MessageState::Failed);
    match &report.items[0].outcome {
        ItemOutcome::Failed { attempts, reason } => {
            assert_eq!(*attempts, 3);
            assert!(reason.contains("connection reset"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.items[1].outcome, ItemOutcome::Done { attempts: 1 });

    // Exactly the retry ceiling, no more
    assert_eq!(variables_for(&executor, 26).len(), 3);
    assert_eq!(variables_for(&executor, 27).len(), 1);

    // A later message is unaffected
    let report = reconciler.reconcile(&message(10, &[(27, 2)])).await;
    assert_eq!(report.state, MessageState::Done);
}

#[tokio::test]
async fn retries_are_spaced_linearly() {
    let executor = Arc::new(failing_for(26));
    let reconciler = StockReconciler::new(executor.clone(), RetryPolicy::new(3, Duration::from_millis(20)));

    reconciler.reconcile(&message(11, &[(26, 1)])).await;

    let calls = executor.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_millis(20));
    assert!(calls[2].at.duration_since(calls[1].at) >= Duration::from_millis(40));
}

#[tokio::test]
async fn redelivery_does_not_decrement_twice() {
    let executor = Arc::new(stock_ok());
    let reconciler = StockReconciler::new(executor.clone(), policy());
    let payload = message(12, &[(26, 3), (26, 1)]);

    let first = reconciler.reconcile(&payload).await;
    assert_eq!(first.state, MessageState::Done);
    assert_eq!(executor.call_count(), 2);

    let second = reconciler.reconcile(&payload).await;
    assert_eq!(second.state, MessageState::Done);
    assert!(second.items.iter().all(|i| i.outcome == ItemOutcome::AlreadyApplied));
    assert_eq!(executor.call_count(), 2);
}

#[tokio::test]
async fn redelivery_retries_only_failed_lines() {
    let executor = Arc::new(RecordingExecutor::new(|n, _, vars| {
        // Variant 27 is down for the whole first delivery
        if vars["variant_id"] == 27 && n < 4 {
            Err(MutationError::GraphQl("lock timeout".to_string()))
        } else {
            Ok(json!({"update_product_variants_by_pk": {"id": vars["variant_id"].clone()}}))
        }
    }));
    let reconciler = StockReconciler::new(executor.clone(), policy());
    let payload = message(13, &[(26, 2), (27, 5)]);

    let first = reconciler.reconcile(&payload).await;
    assert_eq!(first.state, MessageState::Failed);

    let second = reconciler.reconcile(&payload).await;
    assert_eq!(second.state, MessageState::Done);
    assert_eq!(second.items[0].outcome, ItemOutcome::AlreadyApplied);
    assert_eq!(second.items[1].outcome, ItemOutcome::Done { attempts: 1 });
    assert_eq!(variables_for(&executor, 26).len(), 1);
}

#[tokio::test]
async fn exhausted_lines_are_dead_lettered() {
    let channel = MemoryChannel::new();
    let executor = Arc::new(failing_for(26));
    let reconciler =
        StockReconciler::new(executor, policy()).with_dead_letter(Arc::new(channel.clone()), "stock_failures");

    reconciler.reconcile(&message(14, &[(26, 3), (27, 1)])).await;

    let letters = channel.drain("stock_failures");
    assert_eq!(letters.len(), 1);
    let failure: ReconciliationFailure = serde_json::from_slice(&letters[0]).unwrap();
    assert_eq!(failure.queue, StockReservationEvent::QUEUE);
    assert_eq!(failure.order_id, 14);
    assert_eq!(failure.variant_id, Some(26));
    assert_eq!(failure.attempts, 3);
}

#[tokio::test]
async fn consumer_drains_queue_and_skips_poison() {
    let channel = MemoryChannel::new();
    let executor = Arc::new(stock_ok());
    let reconciler = Arc::new(StockReconciler::new(executor.clone(), policy()));

    channel
        .publish(StockReservationEvent::QUEUE, b"definitely not json".to_vec())
        .await
        .unwrap();
    publish_event(
        &channel,
        &StockReservationEvent {
            order_id: 501,
            items: vec![StockItem { variant_id: 26, quantity: 3 }],
        },
    )
    .await
    .unwrap();

    let mut tasks = BackgroundTasks::new();
    workers::register(
        &mut tasks,
        Arc::new(channel.clone()) as Arc<dyn MessageChannel>,
        AckMode::AfterProcessing,
        reconciler.clone(),
        Duration::from_secs(60),
    );

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while reconciler.ledger_len() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(executor.call_count(), 1);
    assert_eq!(channel.pending(StockReservationEvent::QUEUE), 0);
    assert_eq!(reconciler.ledger_len(), 1);

    tasks.shutdown().await;
}
