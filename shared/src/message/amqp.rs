//! RabbitMQ-backed channel

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;

use super::channel::{AckMode, Acker, ChannelError, Delivery, MessageChannel, Subscription};

/// Persistent delivery mode (survives broker restart together with a durable queue)
const DELIVERY_MODE_PERSISTENT: u8 = 2;

struct Link {
    // Dropping the connection closes the channel, keep it alongside
    _connection: Connection,
    channel: Channel,
}

/// AMQP 0-9-1 channel
///
/// The connection is opened on first use and reopened when the cached one
/// has dropped, so a broker restart does not require a service restart.
pub struct AmqpChannel {
    url: String,
    link: Mutex<Option<Link>>,
}

impl AmqpChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            link: Mutex::new(None),
        }
    }

    /// Open the connection eagerly so startup fails fast on a bad URL
    pub async fn connect(url: impl Into<String>) -> Result<Self, ChannelError> {
        let this = Self::new(url);
        this.channel().await?;
        Ok(this)
    }

    async fn channel(&self) -> Result<Channel, ChannelError> {
        let mut guard = self.link.lock().await;
        if let Some(link) = guard.as_ref()
            && link.channel.status().connected()
        {
            return Ok(link.channel.clone());
        }

        if guard.is_some() {
            tracing::warn!("AMQP channel lost, reconnecting");
        }

        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;

        tracing::info!("AMQP connection established");
        *guard = Some(Link {
            _connection: connection,
            channel: channel.clone(),
        });
        Ok(channel)
    }

    async fn declare(channel: &Channel, queue: &str) -> Result<(), lapin::Error> {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for AmqpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // URL carries credentials
        f.debug_struct("AmqpChannel").finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageChannel for AmqpChannel {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        let channel = self.channel().await?;
        let publish_err = |e: lapin::Error| ChannelError::Publish {
            queue: queue.to_string(),
            reason: e.to_string(),
        };

        Self::declare(&channel, queue).await.map_err(publish_err)?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT);

        let confirmation = channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(publish_err)?
            .await
            .map_err(publish_err)?;

        if confirmation.is_nack() {
            return Err(ChannelError::Publish {
                queue: queue.to_string(),
                reason: "broker rejected the message".to_string(),
            });
        }

        tracing::debug!(queue, bytes = payload.len(), "Message published");
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        ack_mode: AckMode,
    ) -> Result<Subscription, ChannelError> {
        let channel = self.channel().await?;
        let consume_err = |e: lapin::Error| ChannelError::Consume {
            queue: queue.to_string(),
            reason: e.to_string(),
        };

        Self::declare(&channel, queue).await.map_err(consume_err)?;

        let no_ack = ack_mode == AckMode::OnDelivery;
        let consumer = channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions {
                    no_ack,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(consume_err)?;

        tracing::info!(queue, %ack_mode, "Subscribed to queue");

        let queue_name = queue.to_string();
        let stream = consumer.map(move |result| match result {
            Ok(delivery) => {
                let acker = if no_ack {
                    Acker::Noop
                } else {
                    Acker::Amqp(delivery.acker)
                };
                Ok(Delivery::new(delivery.data, acker))
            }
            Err(e) => Err(ChannelError::Consume {
                queue: queue_name.clone(),
                reason: e.to_string(),
            }),
        });

        Ok(Subscription::new(queue, stream.boxed()))
    }
}
