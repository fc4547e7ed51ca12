//! Message channel abstraction
//!
//! Durable publish/consume over named queues. Services talk to the broker only
//! through [`MessageChannel`], so the same consumer code runs against RabbitMQ
//! in production and [`MemoryChannel`] in tests.
//!
//! # Delivery semantics
//!
//! Publishing waits for the broker confirm. Consumption is at-least-once when
//! acking after processing ([`AckMode::AfterProcessing`], the default), so every
//! handler has to tolerate redelivery of the same event.

pub mod amqp;
pub mod channel;
pub mod consumer;
pub mod memory;

pub use amqp::AmqpChannel;
pub use channel::{AckMode, Acker, ChannelError, Delivery, MessageChannel, Subscription};
pub use consumer::{MessageHandler, run_consumer};
pub use memory::MemoryChannel;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A JSON message bound to one queue
pub trait WireEvent: Serialize + DeserializeOwned + Send + Sync {
    const QUEUE: &'static str;
}

/// Serialize `event` and publish it to its queue
pub async fn publish_event<E: WireEvent>(
    channel: &dyn MessageChannel,
    event: &E,
) -> Result<(), ChannelError> {
    let payload = serde_json::to_vec(event)?;
    channel.publish(E::QUEUE, payload).await
}

/// Decode a raw delivery into `E`
pub fn decode_event<E: WireEvent>(payload: &[u8]) -> Result<E, serde_json::Error> {
    serde_json::from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        n: u32,
    }

    impl WireEvent for Ping {
        const QUEUE: &'static str = "ping_queue";
    }

    #[tokio::test]
    async fn test_publish_event_targets_its_queue() {
        let channel = MemoryChannel::new();
        publish_event(&channel, &Ping { n: 7 }).await.unwrap();

        let raw = channel.drain("ping_queue");
        assert_eq!(raw.len(), 1);
        assert_eq!(decode_event::<Ping>(&raw[0]).unwrap(), Ping { n: 7 });
    }

    #[test]
    fn test_decode_event_rejects_garbage() {
        assert!(decode_event::<Ping>(b"not json").is_err());
        assert!(decode_event::<Ping>(br#"{"n":"seven"}"#).is_err());
    }
}
