//! Numeric error codes reported by the storefront services
//!
//! - 1xxx: bearer token problems
//! - 2xxx: role checks
//! - 4xxx: order requests
//! - 9xxx: storage and remote collaborators

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 1xxx: Token ====================
    /// No bearer token on the request
    NotAuthenticated = 1001,
    TokenExpired = 1003,
    /// Forged, malformed or signed with another algorithm
    TokenInvalid = 1004,
    /// Token verified but carries no user id
    MissingClaim = 1008,

    // ==================== 2xxx: Role ====================
    RoleRequired = 2002,

    // ==================== 4xxx: Order ====================
    OrderNotFound = 4001,
    OrderEmpty = 4007,
    InvalidOrderItem = 4008,
    InvalidOrderStatus = 4009,

    // ==================== 9xxx: Collaborators ====================
    InternalError = 9001,
    /// Payment store query failed
    DatabaseError = 9002,
    /// Order write through the gateway failed, not retried
    PersistenceFailed = 9003,
    /// Mutation gateway unreachable or rejected the call
    MutationFailed = 9201,
    /// Broker connection could not be established
    ChannelUnavailable = 9202,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default message when the caller supplies none
    pub const fn message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Authentication required",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Invalid token",
            Self::MissingClaim => "Token is missing a required claim",
            Self::RoleRequired => "Role required",
            Self::OrderNotFound => "Order not found",
            Self::OrderEmpty => "Order must contain at least one item",
            Self::InvalidOrderItem => "Invalid order item",
            Self::InvalidOrderStatus => "Invalid order status",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::PersistenceFailed => "Failed to persist record",
            Self::MutationFailed => "Remote mutation failed",
            Self::ChannelUnavailable => "Message channel unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_are_stable() {
        assert_eq!(ErrorCode::TokenInvalid.code(), 1004);
        assert_eq!(ErrorCode::MissingClaim.code(), 1008);
        assert_eq!(ErrorCode::RoleRequired.code(), 2002);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::OrderEmpty.code(), 4007);
        assert_eq!(ErrorCode::PersistenceFailed.code(), 9003);
        assert_eq!(ErrorCode::MutationFailed.code(), 9201);
        assert_eq!(ErrorCode::ChannelUnavailable.code(), 9202);
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::OrderNotFound).unwrap(), "4001");
    }

    #[test]
    fn test_message() {
        assert_eq!(
            ErrorCode::OrderEmpty.message(),
            "Order must contain at least one item"
        );
    }
}
