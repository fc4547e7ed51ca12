//! Managed queue consumer loop

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::channel::{AckMode, Acker, Delivery, MessageChannel};

/// Delay before re-subscribing after the broker dropped or refused us
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Processes one raw message
///
/// Handlers own their failures: whatever happens inside, the message counts
/// as consumed once `handle` returns.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]);
}

/// Consume `queue` until `shutdown` is cancelled
///
/// A delivery that is already being handled when shutdown fires runs to
/// completion (and is acked) before the loop exits.
pub async fn run_consumer(
    channel: Arc<dyn MessageChannel>,
    queue: String,
    ack_mode: AckMode,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
) {
    tracing::info!(queue = %queue, %ack_mode, "Consumer starting");

    'outer: loop {
        let mut subscription = tokio::select! {
            _ = shutdown.cancelled() => break 'outer,
            result = channel.subscribe(&queue, ack_mode) => match result {
                Ok(sub) => sub,
                Err(e) => {
                    tracing::error!(queue = %queue, error = %e, "Subscribe failed, retrying");
                    tokio::select! {
                        _ = shutdown.cancelled() => break 'outer,
                        _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => continue 'outer,
                    }
                }
            },
        };

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break 'outer,
                next = subscription.next() => next,
            };

            match next {
                Some(Ok(delivery)) => process(&queue, ack_mode, handler.as_ref(), delivery).await,
                Some(Err(e)) => {
                    tracing::error!(queue = %queue, error = %e, "Delivery error");
                }
                None => {
                    tracing::warn!(queue = %queue, "Subscription closed, re-subscribing");
                    tokio::select! {
                        _ = shutdown.cancelled() => break 'outer,
                        _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => continue 'outer,
                    }
                }
            }
        }
    }

    tracing::info!(queue = %queue, "Consumer stopped");
}

async fn process(queue: &str, ack_mode: AckMode, handler: &dyn MessageHandler, delivery: Delivery) {
    let (data, acker) = delivery.into_parts();
    match ack_mode {
        AckMode::OnDelivery => {
            ack(queue, acker).await;
            handler.handle(&data).await;
        }
        AckMode::AfterProcessing => {
            handler.handle(&data).await;
            ack(queue, acker).await;
        }
    }
}

async fn ack(queue: &str, acker: Acker) {
    if let Err(e) = acker.ack().await {
        tracing::warn!(queue, error = %e, "Ack failed, message may be redelivered");
    }
}
