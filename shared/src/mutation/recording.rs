//! Scripted mutation executor
//!
//! Records every call and answers from a responder closure. Not a mock of
//! the gateway protocol: callers decide what each call returns.

use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{MutationError, MutationExecutor};

type Responder = dyn Fn(usize, &str, &Value) -> Result<Value, MutationError> + Send + Sync;

/// One call seen by [`RecordingExecutor`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub query: String,
    pub variables: Value,
    pub at: Instant,
}

pub struct RecordingExecutor {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingExecutor {
    /// `responder(call_index, query, variables)`, `call_index` starts at 0
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(usize, &str, &Value) -> Result<Value, MutationError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok(data: Value) -> Self {
        Self::new(move |_, _, _| Ok(data.clone()))
    }

    pub fn always_failing() -> Self {
        Self::new(|_, _, _| Err(MutationError::Transport("connection refused".to_string())))
    }

    /// Fail the first `failures` calls, then answer `data`
    pub fn fail_then_ok(failures: usize, data: Value) -> Self {
        Self::new(move |n, _, _| {
            if n < failures {
                Err(MutationError::Status {
                    status: 503,
                    body: "service unavailable".to_string(),
                })
            } else {
                Ok(data.clone())
            }
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls whose query text contains `needle`
    pub fn calls_containing(&self, needle: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.query.contains(needle))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for RecordingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingExecutor")
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl MutationExecutor for RecordingExecutor {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, MutationError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(RecordedCall {
                query: query.to_string(),
                variables: variables.clone(),
                at: Instant::now(),
            });
            calls.len() - 1
        };
        (self.responder)(index, query, &variables)
    }
}
