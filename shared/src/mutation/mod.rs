//! Remote mutation gateway
//!
//! Every write that leaves a service goes through [`MutationExecutor`], a
//! single "run this GraphQL mutation" operation. Production uses
//! [`HasuraClient`]; tests script responses with [`RecordingExecutor`].

pub mod client;
pub mod documents;
pub mod recording;
pub mod retry;

pub use client::HasuraClient;
pub use recording::{RecordedCall, RecordingExecutor};
pub use retry::{Retried, RetryExhausted, RetryPolicy, execute_with_retry};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;

/// Mutation gateway errors (all considered transient by the retry loop)
#[derive(Debug, Clone, Error)]
pub enum MutationError {
    /// Gateway unreachable, timed out, or the body could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status
    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx body carrying GraphQL `errors`
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// 2xx body that is not a GraphQL response
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<MutationError> for AppError {
    fn from(e: MutationError) -> Self {
        AppError::mutation_failed(e.to_string())
    }
}

impl From<RetryExhausted> for AppError {
    fn from(e: RetryExhausted) -> Self {
        AppError::mutation_failed(e.to_string()).with_detail("attempts", e.attempts)
    }
}

/// Execute one GraphQL mutation, returning its `data` object
#[async_trait]
pub trait MutationExecutor: Send + Sync {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, MutationError>;
}
