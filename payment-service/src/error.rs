//! Payment service errors

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use shared::message::ChannelError;
use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum PaymentError {
    /// No payment row exists for the order
    #[error("No payment found for order {0}")]
    OrderNotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl From<PaymentError> for AppError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::OrderNotFound(id) => AppError::with_message(
                ErrorCode::OrderNotFound,
                format!("No payment found for order {id}"),
            )
            .with_detail("order_id", id),
            PaymentError::Store(err) => {
                tracing::error!(error = %err, "Payment store error");
                AppError::database("Payment store error")
            }
            PaymentError::Channel(err) => err.into(),
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> axum::response::Response {
        AppError::from(self).into_response()
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_mapping() {
        let err: AppError = PaymentError::OrderNotFound(9).into();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);

        let err: AppError = PaymentError::Store(StoreError::Corrupt("status".into())).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: AppError =
            PaymentError::Channel(ChannelError::Unavailable("refused".into())).into();
        assert_eq!(err.code, ErrorCode::ChannelUnavailable);
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
