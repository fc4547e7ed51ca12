//! In-process channel
//!
//! Named FIFO queues held in memory. Messages published before anyone
//! subscribes are retained, and several subscribers on one queue compete for
//! messages the way broker consumers do. Used by tests and by local runs
//! without a broker.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::channel::{AckMode, Acker, ChannelError, Delivery, MessageChannel, Subscription};

#[derive(Default)]
struct Queue {
    messages: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

impl Queue {
    async fn pop(&self) -> Vec<u8> {
        loop {
            let notified = self.notify.notified();
            if let Some(message) = self.messages.lock().pop_front() {
                return message;
            }
            notified.await;
        }
    }
}

/// In-memory [`MessageChannel`]
#[derive(Clone, Default)]
pub struct MemoryChannel {
    queues: Arc<Mutex<HashMap<String, Arc<Queue>>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, name: &str) -> Arc<Queue> {
        self.queues
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Number of messages waiting in `queue`
    pub fn pending(&self, queue: &str) -> usize {
        self.queue(queue).messages.lock().len()
    }

    /// Remove and return every message waiting in `queue`
    pub fn drain(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queue(queue).messages.lock().drain(..).collect()
    }
}

impl std::fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queues: Vec<String> = self.queues.lock().keys().cloned().collect();
        f.debug_struct("MemoryChannel")
            .field("queues", &queues)
            .finish()
    }
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        let q = self.queue(queue);
        q.messages.lock().push_back(payload);
        q.notify.notify_one();
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        _ack_mode: AckMode,
    ) -> Result<Subscription, ChannelError> {
        let q = self.queue(queue);
        let stream = futures::stream::unfold(q, |q| async move {
            let data = q.pop().await;
            Some((Ok(Delivery::new(data, Acker::Noop)), q))
        });
        Ok(Subscription::new(queue, Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_retains_messages_published_before_subscribe() {
        let channel = MemoryChannel::new();
        channel.publish("q", b"one".to_vec()).await.unwrap();
        channel.publish("q", b"two".to_vec()).await.unwrap();
        assert_eq!(channel.pending("q"), 2);

        let mut sub = channel.subscribe("q", AckMode::default()).await.unwrap();
        let first = sub.next().await.unwrap().unwrap();
        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(first.data, b"one");
        assert_eq!(second.data, b"two");
        assert_eq!(channel.pending("q"), 0);
    }

    #[tokio::test]
    async fn test_wakes_waiting_subscriber() {
        let channel = MemoryChannel::new();
        let mut sub = channel.subscribe("q", AckMode::OnDelivery).await.unwrap();

        let publisher = channel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            publisher.publish("q", b"late".to_vec()).await.unwrap();
        });

        let delivery = tokio::time::timeout(std::time::Duration::from_secs(1), sub.next())
            .await
            .expect("delivery within timeout")
            .unwrap()
            .unwrap();
        assert_eq!(delivery.data, b"late");
    }

    #[tokio::test]
    async fn test_queues_are_isolated() {
        let channel = MemoryChannel::new();
        channel.publish("a", b"x".to_vec()).await.unwrap();
        assert_eq!(channel.pending("a"), 1);
        assert_eq!(channel.pending("b"), 0);
        assert_eq!(channel.drain("a"), vec![b"x".to_vec()]);
    }
}
