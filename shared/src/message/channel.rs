//! Channel trait and delivery types

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::error::AppError;

/// Channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Broker connection or channel could not be established
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    /// Broker refused or failed to confirm a publish
    #[error("Publish to '{queue}' failed: {reason}")]
    Publish { queue: String, reason: String },

    /// Subscription could not be set up or broke mid-stream
    #[error("Consume from '{queue}' failed: {reason}")]
    Consume { queue: String, reason: String },

    /// Acknowledgement could not be delivered to the broker
    #[error("Ack failed: {0}")]
    Ack(String),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ChannelError> for AppError {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::Serialize(err) => AppError::internal(err.to_string()),
            other => AppError::channel_unavailable(other.to_string()),
        }
    }
}

/// When a delivery is acknowledged to the broker
///
/// `OnDelivery` is at-most-once: a crash mid-handler loses the message.
/// `AfterProcessing` is at-least-once: a crash mid-handler redelivers it, so
/// handlers must be idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    OnDelivery,
    #[default]
    AfterProcessing,
}

impl FromStr for AckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_delivery" | "auto" => Ok(AckMode::OnDelivery),
            "after_processing" | "manual" => Ok(AckMode::AfterProcessing),
            other => Err(format!("unknown ack mode '{other}'")),
        }
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckMode::OnDelivery => write!(f, "on_delivery"),
            AckMode::AfterProcessing => write!(f, "after_processing"),
        }
    }
}

/// Broker-specific acknowledgement handle
pub enum Acker {
    /// Nothing to acknowledge (auto-ack or in-process queue)
    Noop,
    Amqp(lapin::acker::Acker),
}

impl Acker {
    pub async fn ack(self) -> Result<(), ChannelError> {
        match self {
            Acker::Noop => Ok(()),
            Acker::Amqp(acker) => acker
                .ack(lapin::options::BasicAckOptions::default())
                .await
                .map_err(|e| ChannelError::Ack(e.to_string())),
        }
    }
}

impl fmt::Debug for Acker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acker::Noop => write!(f, "Acker::Noop"),
            Acker::Amqp(_) => write!(f, "Acker::Amqp"),
        }
    }
}

/// One message handed to a consumer
#[derive(Debug)]
pub struct Delivery {
    pub data: Vec<u8>,
    acker: Acker,
}

impl Delivery {
    pub fn new(data: Vec<u8>, acker: Acker) -> Self {
        Self { data, acker }
    }

    /// Acknowledge the delivery
    pub async fn ack(self) -> Result<(), ChannelError> {
        self.acker.ack().await
    }

    pub fn into_parts(self) -> (Vec<u8>, Acker) {
        (self.data, self.acker)
    }
}

/// Stream of deliveries from one queue
pub struct Subscription {
    pub queue: String,
    inner: BoxStream<'static, Result<Delivery, ChannelError>>,
}

impl Subscription {
    pub fn new(
        queue: impl Into<String>,
        inner: BoxStream<'static, Result<Delivery, ChannelError>>,
    ) -> Self {
        Self {
            queue: queue.into(),
            inner,
        }
    }
}

impl Stream for Subscription {
    type Item = Result<Delivery, ChannelError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Durable publish/consume primitive over named queues
///
/// Implementations declare queues as durable before first use. No ordering is
/// promised across queues; within one queue delivery order is best-effort.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Publish a serialized payload to `queue`
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), ChannelError>;

    /// Start consuming `queue`
    async fn subscribe(&self, queue: &str, ack_mode: AckMode)
    -> Result<Subscription, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_mode_parse() {
        assert_eq!("on_delivery".parse::<AckMode>(), Ok(AckMode::OnDelivery));
        assert_eq!(
            "after_processing".parse::<AckMode>(),
            Ok(AckMode::AfterProcessing)
        );
        assert!("sometimes".parse::<AckMode>().is_err());
        assert_eq!(AckMode::default(), AckMode::AfterProcessing);
    }

    #[tokio::test]
    async fn test_noop_ack() {
        let delivery = Delivery::new(b"{}".to_vec(), Acker::Noop);
        assert!(delivery.ack().await.is_ok());
    }

    #[test]
    fn test_channel_error_into_app_error() {
        let err: AppError = ChannelError::Unavailable("refused".into()).into();
        assert_eq!(err.code, crate::error::ErrorCode::ChannelUnavailable);
    }
}
