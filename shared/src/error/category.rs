//! Failure taxonomy

use super::codes::ErrorCode;

/// What kind of failure a code reports, and so how a caller should react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad input, never retried
    Validation,
    /// Missing, forged or expired token, or the wrong role; never retried
    Auth,
    NotFound,
    /// Gateway or broker trouble; the caller may try again later
    TransientRemote,
    /// A local write failed and was not retried
    PersistenceFailed,
    Internal,
}

impl ErrorCategory {
    /// Whether the failure is on our side and worth an error log
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Self::PersistenceFailed | Self::Internal)
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::OrderEmpty | Self::InvalidOrderItem | Self::InvalidOrderStatus => {
                ErrorCategory::Validation
            }
            Self::NotAuthenticated
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::MissingClaim
            | Self::RoleRequired => ErrorCategory::Auth,
            Self::OrderNotFound => ErrorCategory::NotFound,
            Self::MutationFailed | Self::ChannelUnavailable => ErrorCategory::TransientRemote,
            Self::PersistenceFailed => ErrorCategory::PersistenceFailed,
            Self::InternalError | Self::DatabaseError => ErrorCategory::Internal,
        }
    }
}
