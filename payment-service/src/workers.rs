//! Background workers of the payment service

use std::sync::Arc;

use shared::events::OrderCreatedEvent;
use shared::message::{AckMode, MessageChannel, WireEvent, run_consumer};
use shared::tasks::{BackgroundTasks, TaskKind};

use crate::reconciler::PaymentReconciler;

/// Register the order created consumer
pub fn register(
    tasks: &mut BackgroundTasks,
    channel: Arc<dyn MessageChannel>,
    ack_mode: AckMode,
    reconciler: Arc<PaymentReconciler>,
) {
    let token = tasks.shutdown_token();
    tasks.spawn(
        OrderCreatedEvent::QUEUE,
        TaskKind::Consumer,
        run_consumer(
            channel,
            OrderCreatedEvent::QUEUE.to_string(),
            ack_mode,
            reconciler,
            token,
        ),
    );
}
