//! HTTP status for each failure

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        if *self == Self::RoleRequired {
            return StatusCode::FORBIDDEN;
        }
        match self.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::Auth => StatusCode::UNAUTHORIZED,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::TransientRemote => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::PersistenceFailed | ErrorCategory::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_category() {
        assert_eq!(ErrorCode::InvalidOrderItem.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::MissingClaim.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::RoleRequired.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::MutationFailed.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::PersistenceFailed.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
