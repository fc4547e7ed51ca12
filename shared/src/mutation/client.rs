//! GraphQL gateway client

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{MutationError, MutationExecutor};

/// Header carrying the gateway admin secret
pub const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Hasura GraphQL endpoint, authenticated with the admin secret
#[derive(Clone)]
pub struct HasuraClient {
    http: reqwest::Client,
    endpoint: String,
    admin_secret: String,
}

impl HasuraClient {
    pub fn new(
        endpoint: impl Into<String>,
        admin_secret: impl Into<String>,
    ) -> Result<Self, MutationError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MutationError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            admin_secret: admin_secret.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for HasuraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasuraClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MutationExecutor for HasuraClient {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, MutationError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header(ADMIN_SECRET_HEADER, &self.admin_secret)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| MutationError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| MutationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(MutationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| MutationError::MalformedResponse(e.to_string()))?;
        interpret_response(parsed)
    }
}

/// Split a 2xx GraphQL body into data or error
pub(crate) fn interpret_response(mut body: Value) -> Result<Value, MutationError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array)
        && !errors.is_empty()
    {
        let message = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(MutationError::GraphQl(if message.is_empty() {
            "unknown GraphQL error".to_string()
        } else {
            message
        }));
    }

    match body.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(MutationError::MalformedResponse(
            "response has no data".to_string(),
        )),
    }
}
