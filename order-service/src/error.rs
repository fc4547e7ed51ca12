//! Order service errors

use shared::error::{AppError, ErrorCode};
use shared::mutation::MutationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    Empty,

    #[error("Item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("{0}")]
    InvalidStatus(String),

    #[error("Order {0} not found")]
    NotFound(i64),

    /// Order could not be written; surfaced to the caller, never retried here
    #[error("Failed to persist order: {0}")]
    PersistenceFailed(String),

    /// Mutation gateway rejected a synchronous update
    #[error("Mutation gateway error: {0}")]
    Gateway(#[from] MutationError),
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match &e {
            OrderError::Empty => AppError::new(ErrorCode::OrderEmpty),
            OrderError::InvalidItem { index, .. } => {
                AppError::with_message(ErrorCode::InvalidOrderItem, e.to_string())
                    .with_detail("index", *index)
            }
            OrderError::InvalidStatus(_) => {
                AppError::with_message(ErrorCode::InvalidOrderStatus, e.to_string())
            }
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, e.to_string())
                    .with_detail("order_id", *id)
            }
            OrderError::PersistenceFailed(_) => AppError::persistence_failed(e.to_string()),
            OrderError::Gateway(_) => AppError::mutation_failed(e.to_string()),
        }
    }
}

impl axum::response::IntoResponse for OrderError {
    fn into_response(self) -> axum::response::Response {
        AppError::from(self).into_response()
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
