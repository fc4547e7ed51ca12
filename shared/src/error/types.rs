//! The error every HTTP handler returns, and its JSON body

use super::codes::ErrorCode;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// A coded failure with an optional bag of structured details
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // Auth

    /// No bearer token presented
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    pub fn missing_claim(claim: impl Into<String>) -> Self {
        let claim = claim.into();
        Self::with_message(
            ErrorCode::MissingClaim,
            format!("Token is missing claim '{claim}'"),
        )
        .with_detail("claim", claim)
    }

    // Remote collaborators

    pub fn mutation_failed(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::MutationFailed, msg)
    }

    pub fn channel_unavailable(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ChannelUnavailable, msg)
    }

    // Storage

    pub fn persistence_failed(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PersistenceFailed, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }
}

/// JSON body of a failed request: `{code, message, details?}`
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: ErrorCode,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a HashMap<String, Value>>,
}

impl<'a> From<&'a AppError> for ErrorBody<'a> {
    fn from(err: &'a AppError) -> Self {
        Self {
            code: err.code,
            message: &err.message,
            details: err.details.as_ref(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let category = self.code.category();
        if category.is_server_fault() {
            tracing::error!(code = %self.code, message = %self.message, "Request failed on our side");
        } else if category == super::category::ErrorCategory::TransientRemote {
            tracing::warn!(code = %self.code, message = %self.message, "Remote collaborator unavailable");
        }

        (self.http_status(), axum::Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_default_message() {
        let err = AppError::new(ErrorCode::OrderEmpty);
        assert_eq!(err.message, "Order must contain at least one item");
        assert!(err.details.is_none());
        assert_eq!(err.to_string(), err.message);
    }

    #[test]
    fn test_missing_claim_carries_detail() {
        let err = AppError::missing_claim("user_id");
        assert_eq!(err.code, ErrorCode::MissingClaim);
        assert_eq!(err.message, "Token is missing claim 'user_id'");
        assert_eq!(err.details.unwrap()["claim"], "user_id");
    }

    #[test]
    fn test_body_shape() {
        let err = AppError::with_message(ErrorCode::OrderNotFound, "Order 9 not found")
            .with_detail("order_id", 9);
        let json = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(json["code"], 4001);
        assert_eq!(json["message"], "Order 9 not found");
        assert_eq!(json["details"]["order_id"], 9);

        let json = serde_json::to_value(ErrorBody::from(&AppError::unauthorized())).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::persistence_failed("insert_orders_one failed").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::channel_unavailable("connection refused").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
